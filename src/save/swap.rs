use super::StellarisSave;
use crate::handles::{EntityHandle, Id, SystemHandle, PRECURSOR_FLAGS};
use crate::text::Value;
use crate::Error;
use log::debug;
use std::collections::BTreeSet;

/// Options for [`StellarisSave::swap_systems`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOptions {
    /// Keep the precursor flags at their location on the map, so they are
    /// exchanged along with the coordinates
    pub preserve_precursors: bool,
}

impl Default for SwapOptions {
    fn default() -> Self {
        SwapOptions {
            preserve_precursors: true,
        }
    }
}

/// Everything a swap touches, resolved before the first write
struct SwapPlan {
    a: SystemHandle,
    b: SystemHandle,
    lane_owners: Vec<SystemHandle>,
}

impl StellarisSave {
    fn plan_swap(&self, a: Id, b: Id) -> Result<SwapPlan, Error> {
        let a = self.get_system_by_id(a)?;
        let b = self.get_system_by_id(b)?;

        let ids: BTreeSet<Id> = [a.id(), b.id()]
            .into_iter()
            .chain(a.neighbour_ids(self))
            .chain(b.neighbour_ids(self))
            .collect();
        let lane_owners = ids
            .into_iter()
            .map(|id| self.get_system_by_id(id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SwapPlan { a, b, lane_owners })
    }

    /// Exchanges two systems' places on the map: their hyperlanes,
    /// coordinates and nebula membership. Every lane elsewhere that pointed at
    /// one of them points at the other afterwards, and a lane between the two
    /// stays a lane between the two.
    ///
    /// Every referenced system is looked up before anything is modified, so
    /// a `system-not-found` error leaves the save untouched.
    pub fn swap_systems(&mut self, a: Id, b: Id, options: SwapOptions) -> Result<(), Error> {
        if a == b {
            return Ok(());
        }

        let plan = self.plan_swap(a, b)?;
        debug!("Swapping systems ID {} and ID {}", a, b);

        for key in ["hyperlane", "coordinate"] {
            let tree = self.tree_mut();
            let a_field = plan.a.entry().get(tree, key)?;
            let b_field = plan.b.entry().get(tree, key)?;
            let a_value = a_field.replace_value(tree, Value::Absent);
            let b_value = b_field.replace_value(tree, a_value);
            a_field.set_value(tree, b_value);
        }

        // Each system's lanes are remapped once, including the two swapped
        // ones whose lane lists now hold the other's records
        for system in &plan.lane_owners {
            let tree = self.tree_mut();
            let lanes = match system.entry().find(tree, "hyperlane").and_then(|x| x.object(tree)) {
                Some(x) => x,
                None => continue,
            };

            let targets: Vec<_> = lanes
                .live_entries(tree)
                .filter_map(|lane| lane.find(tree, "to"))
                .collect();
            for to in targets {
                let mapped = match to.value(tree).as_id() {
                    Some(x) if x == a => b,
                    Some(x) if x == b => a,
                    _ => continue,
                };
                to.set_value(tree, mapped);
            }
        }

        let a_nebula = self.find_nebula_by_system(a);
        let b_nebula = self.find_nebula_by_system(b);
        if a_nebula.map(|x| x.index()) != b_nebula.map(|x| x.index()) {
            if let Some(nebula) = a_nebula {
                nebula.remove_system(self, a);
                nebula.add_system(self, b)?;
            }
            if let Some(nebula) = b_nebula {
                nebula.remove_system(self, b);
                nebula.add_system(self, a)?;
            }
        }

        if options.preserve_precursors {
            for (flag, _) in PRECURSOR_FLAGS {
                let a_value = plan.a.flag_value(self, flag).unwrap_or_default();
                let b_value = plan.b.flag_value(self, flag).unwrap_or_default();
                plan.a.set_flag_value(self, flag, b_value)?;
                plan.b.set_flag_value(self, flag, a_value)?;
            }
        }

        Ok(())
    }
}
