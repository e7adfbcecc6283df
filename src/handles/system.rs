use super::{
    field_id, field_text, set_field, set_field_quoted, CoordsData, CoordsHandle,
    EntityHandle, Id, PlanetHandle, SectorHandle, ShipHandle, UNDEFINED_ID,
};
use crate::text::{ObjectHandle, Value};
use crate::{EntityKind, Error, ErrorKind, StellarisSave};
use log::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value the game stores for a set flag (a date stamp)
pub const FLAG_STAMP: u32 = 62808000;

/// Flags marking the systems of each precursor chain, with the precursor's
/// name
pub const PRECURSOR_FLAGS: [(&str, &str); 7] = [
    ("precursor_1", "Cybrex"),
    ("precursor_2", "First League"),
    ("precursor_3", "Irassian Concordat"),
    ("precursor_4", "Vultaum Star Assembly"),
    ("precursor_5", "Yuht Empire"),
    ("precursor_zroni_1", "Zroni"),
    ("precursor_baol_1", "Baol"),
];

/// One stored direction of a hyperlane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hyperlane {
    pub to: Id,
    pub length: u32,
}

/// What to do when a relationship points at a system that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnMissing {
    /// Fail with `system-not-found` before anything is modified
    #[default]
    Error,

    /// Log and skip the system
    Warning,

    /// Silently skip the system
    Ignore,
}

impl OnMissing {
    fn check(self, id: Id, action: &str) -> Result<(), Error> {
        match self {
            OnMissing::Error => Err(Error::not_found(EntityKind::System, id)),
            OnMissing::Warning => {
                warn!("system {} not found while {} hyperlanes", id, action);
                Ok(())
            }
            OnMissing::Ignore => Ok(()),
        }
    }
}

entity_handle!(
    /// A star system (`galactic_object`)
    SystemHandle,
    EntityKind::System
);

impl SystemHandle {
    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name"])
    }

    pub fn set_name(&self, save: &mut StellarisSave, name: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["name"], name)
    }

    pub fn coords(&self, save: &StellarisSave) -> Option<CoordsHandle> {
        let tree = save.tree();
        self.entry
            .find(tree, "coordinate")
            .and_then(|x| x.object(tree))
            .map(CoordsHandle::new)
    }

    /// The position, or the galaxy center when the system has none
    pub fn coords_data(&self, save: &StellarisSave) -> CoordsData {
        self.coords(save)
            .map(|x| x.data(save.tree()))
            .unwrap_or_else(|| CoordsData::galactic(0.0, 0.0))
    }

    pub fn set_coords(&self, save: &mut StellarisSave, coords: &CoordsData) -> Result<(), Error> {
        let tree = save.tree_mut();
        let object = self.entry.get(tree, "coordinate")?.value_as_object(tree)?;
        CoordsHandle::new(object).set(tree, coords);
        Ok(())
    }

    pub fn initializer(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["initializer"])
    }

    pub fn set_initializer(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["initializer"], value)
    }

    pub fn star_class(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["star_class"])
    }

    pub fn set_star_class(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["star_class"], value)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Flags

    fn flags(&self, save: &StellarisSave) -> Option<ObjectHandle> {
        let tree = save.tree();
        self.entry.find(tree, "flags").and_then(|x| x.object(tree))
    }

    /// Names of every set flag
    pub fn flag_names(&self, save: &StellarisSave) -> Vec<String> {
        let tree = save.tree();
        self.flags(save)
            .map(|flags| {
                flags
                    .live_entries(tree)
                    .filter_map(|e| e.key(tree).as_text().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_flag(&self, save: &StellarisSave, name: &str) -> bool {
        self.flag_value(save, name).is_some()
    }

    /// The raw value stored for a flag
    pub fn flag_value(&self, save: &StellarisSave, name: &str) -> Option<Value> {
        let tree = save.tree();
        self.flags(save)?
            .find(tree, name)
            .map(|x| x.value(tree).clone())
            .filter(|x| !x.is_absent())
    }

    /// Sets a flag with the usual stamp, or removes it
    pub fn set_flag(&self, save: &mut StellarisSave, name: &str, on: bool) -> Result<(), Error> {
        let value = if on { Value::from(FLAG_STAMP) } else { Value::Absent };
        self.set_flag_value(save, name, value)
    }

    /// Stores a raw flag value. An absent value removes the flag
    pub fn set_flag_value(
        &self,
        save: &mut StellarisSave,
        name: &str,
        value: Value,
    ) -> Result<(), Error> {
        if value.is_absent() {
            if let Some(flags) = self.flags(save) {
                flags.remove_all_by_key(save.tree_mut(), name);
            }
            return Ok(());
        }

        set_field(save, self.entry, &["flags", name], value)
    }

    /// The precursor flags set on the system
    pub fn precursor_flags(&self, save: &StellarisSave) -> Vec<&'static str> {
        PRECURSOR_FLAGS
            .iter()
            .map(|&(flag, _)| flag)
            .filter(|flag| self.has_flag(save, flag))
            .collect()
    }

    /// The name of the precursor a flag marks
    ///
    /// ```
    /// use stellaris_save::handles::SystemHandle;
    /// assert_eq!(SystemHandle::precursor_name("precursor_zroni_1"), Some("Zroni"));
    /// assert_eq!(SystemHandle::precursor_name("precursor_9"), None);
    /// ```
    pub fn precursor_name(flag: &str) -> Option<&'static str> {
        PRECURSOR_FLAGS
            .iter()
            .find(|&&(x, _)| x == flag)
            .map(|&(_, name)| name)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Hyperlanes

    fn lanes(&self, save: &StellarisSave) -> Option<ObjectHandle> {
        let tree = save.tree();
        self.entry
            .find(tree, "hyperlane")
            .and_then(|x| x.object(tree))
    }

    pub fn hyperlanes(&self, save: &StellarisSave) -> Vec<Hyperlane> {
        let tree = save.tree();
        let lanes = match self.lanes(save) {
            Some(x) => x,
            None => return Vec::new(),
        };

        lanes
            .live_entries(tree)
            .filter_map(|lane| {
                let to = lane.find(tree, "to")?.value(tree).as_id()?;
                let length = lane
                    .find(tree, "length")
                    .and_then(|x| x.value(tree).as_f64())
                    .unwrap_or(0.0);
                Some(Hyperlane {
                    to,
                    length: length as u32,
                })
            })
            .collect()
    }

    /// Ids of the systems this one has a hyperlane to
    pub fn neighbour_ids(&self, save: &StellarisSave) -> Vec<Id> {
        self.hyperlanes(save).into_iter().map(|x| x.to).collect()
    }

    pub fn neighbours(&self, save: &StellarisSave) -> Result<Vec<SystemHandle>, Error> {
        self.neighbour_ids(save)
            .into_iter()
            .map(|id| save.get_system_by_id(id))
            .collect()
    }

    fn push_lane(&self, save: &mut StellarisSave, to: Id, length: u32) -> Result<bool, Error> {
        if self.neighbour_ids(save).contains(&to) {
            return Ok(false);
        }

        let tree = save.tree_mut();
        let lanes = self.entry.get(tree, "hyperlane")?.value_as_object(tree)?;
        let lane = lanes.push_element_object(tree);
        lane.push(tree, "to", to);
        lane.push(tree, "length", length);
        Ok(true)
    }

    fn remove_lanes_to(&self, save: &mut StellarisSave, to: Id) -> usize {
        let lanes = match self.lanes(save) {
            Some(x) => x,
            None => return 0,
        };

        let tree = save.tree();
        let doomed: Vec<_> = lanes
            .entries(tree)
            .filter(|lane| lane.find(tree, "to").and_then(|x| x.value(tree).as_id()) == Some(to))
            .collect();

        let tree = save.tree_mut();
        for lane in &doomed {
            lanes.remove_entry(tree, *lane);
        }
        doomed.len()
    }

    /// Resolves the targets of a hyperlane edit up front so that an error
    /// leaves everything untouched
    fn resolve_targets(
        &self,
        save: &StellarisSave,
        targets: &[Id],
        on_missing: OnMissing,
        action: &str,
    ) -> Result<Vec<SystemHandle>, Error> {
        let mut result: Vec<SystemHandle> = Vec::with_capacity(targets.len());
        for &id in targets {
            if id == self.id || result.iter().any(|x| x.id == id) {
                continue;
            }

            match save.find_system_by_id(id) {
                Some(system) => result.push(system),
                None => on_missing.check(id, action)?,
            }
        }
        Ok(result)
    }

    /// Connects this system with each target in both directions. The length
    /// of the lane is the rounded distance between the two systems. Existing
    /// lanes are left alone
    pub fn add_hyperlanes(
        &self,
        save: &mut StellarisSave,
        targets: &[Id],
        on_missing: OnMissing,
    ) -> Result<(), Error> {
        let others = self.resolve_targets(save, targets, on_missing, "adding")?;
        let here = self.coords_data(save);
        for other in others {
            let length = here.distance_to(&other.coords_data(save)).round() as u32;
            self.push_lane(save, other.id, length)?;
            other.push_lane(save, self.id, length)?;
            debug!("Added hyperlane between systems {} and {}", self.id, other.id);
        }
        Ok(())
    }

    /// Disconnects this system from each target in both directions
    pub fn remove_hyperlanes(
        &self,
        save: &mut StellarisSave,
        targets: &[Id],
        on_missing: OnMissing,
    ) -> Result<(), Error> {
        let connected = self.neighbour_ids(save);
        let targets: Vec<Id> = targets
            .iter()
            .copied()
            .filter(|x| connected.contains(x))
            .collect();
        let others = self.resolve_targets(save, &targets, on_missing, "removing")?;

        for &id in &targets {
            self.remove_lanes_to(save, id);
        }

        for other in others {
            other.remove_lanes_to(save, self.id);
        }
        Ok(())
    }

    /// Disconnects this system from every neighbour
    pub fn remove_all_hyperlanes(
        &self,
        save: &mut StellarisSave,
        on_missing: OnMissing,
    ) -> Result<(), Error> {
        let neighbours = self.neighbour_ids(save);
        self.remove_hyperlanes(save, &neighbours, on_missing)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Related

    pub fn planet_ids(&self, save: &StellarisSave) -> Vec<Id> {
        let tree = save.tree();
        self.entry
            .get_all(tree, "planet")
            .into_iter()
            .filter_map(|x| x.value(tree).as_id())
            .collect()
    }

    pub fn planets(&self, save: &StellarisSave) -> Result<Vec<PlanetHandle>, Error> {
        self.planet_ids(save)
            .into_iter()
            .map(|id| save.get_planet_by_id(id))
            .collect()
    }

    pub fn sector_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["sector"])
    }

    pub fn sector(&self, save: &StellarisSave) -> Result<Option<SectorHandle>, Error> {
        self.sector_id(save)
            .map(|id| save.get_sector_by_id(id))
            .transpose()
    }

    /// Moves the system into a sector, or out of any with `None`
    pub fn set_sector(&self, save: &mut StellarisSave, sector: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["sector"], sector.unwrap_or(UNDEFINED_ID))
    }

    pub fn starbase_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["starbase"])
    }

    pub fn starbase(&self, save: &StellarisSave) -> Result<Option<ShipHandle>, Error> {
        self.starbase_id(save)
            .map(|id| save.get_ship_by_id(id))
            .transpose()
    }

    /// Sets the starbase ship, or removes the entry with `None`
    pub fn set_starbase(&self, save: &mut StellarisSave, ship: Option<Id>) -> Result<(), Error> {
        match ship {
            Some(id) => set_field(save, self.entry, &["starbase"], id),
            None => {
                if let Some(object) = self.object(save) {
                    object.remove_all_by_key(save.tree_mut(), "starbase");
                }
                Ok(())
            }
        }
    }

    /// Fleets currently in the system
    pub fn fleet_presence_ids(&self, save: &StellarisSave) -> Vec<Id> {
        super::field_ids(save, self.entry, &["fleet_presence"])
    }

    pub fn register_fleet(&self, save: &mut StellarisSave, fleet: Id) -> Result<(), Error> {
        super::push_id(save, self.entry, &["fleet_presence"], fleet).map(|_| ())
    }

    pub fn unregister_fleet(&self, save: &mut StellarisSave, fleet: Id) {
        super::remove_id(save, self.entry, &["fleet_presence"], fleet);
    }

    /// Removing systems is not supported: too much of the gamestate refers
    /// to them
    pub fn remove(&self, _save: &mut StellarisSave) -> Result<(), Error> {
        Err(Error::new(ErrorKind::NotImplemented("removing systems")))
    }

    /// Adds a new system with no planets or hyperlanes. The id is one more
    /// than the highest system id
    pub fn new(
        save: &mut StellarisSave,
        name: &str,
        coords: &CoordsData,
    ) -> Result<SystemHandle, Error> {
        let id = match save.systems().last() {
            None => 0,
            Some(last) => last
                .id
                .checked_add(1)
                .filter(|&x| x != UNDEFINED_ID)
                .ok_or_else(|| {
                    Error::invalid_state(
                        "invalid-state/id-exhausted",
                        format!("no system id left after {}", last.id),
                    )
                })?,
        };
        debug!("Adding new system ID {} named '{}'", id, name);

        let tree = save.tree_mut();
        let object = ObjectHandle::new(tree.new_object());
        let coordinate = coords.write(tree);
        object.push(tree, "coordinate", coordinate.value());
        object.push(tree, "type", Value::word("star"));
        object.push(tree, "name", Value::quoted(name));
        object.push(tree, "star_class", Value::quoted("sc_g"));
        let lanes = tree.new_object();
        object.push(tree, "hyperlane", lanes);
        object.push(tree, "sector", UNDEFINED_ID);

        let entry = save.push_entity(&["galactic_object"], id, object)?;
        let system = SystemHandle { id, entry };
        save.systems.insert(id, system);
        Ok(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
galactic_object={
	0={
		coordinate={ x=0 y=0 origin=4294967295 }
		name="A"
		flags={ precursor_1=62808000 custom=5 }
		sector=4294967295
	}
	1={
		coordinate={ x=30 y=40 origin=4294967295 }
		name="B"
		sector=2
	}
	2={
		coordinate={ x=0 y=10 origin=4294967295 }
		name="C"
	}
}
sectors={
	2={ name="Core" owner=0 systems={ 1 } }
}
"#;

    fn save() -> StellarisSave {
        StellarisSave::from_strs("", GAMESTATE).unwrap()
    }

    #[test]
    fn hyperlanes_are_symmetric() {
        let mut save = save();
        let a = save.get_system_by_id(0).unwrap();
        let b = save.get_system_by_id(1).unwrap();
        a.add_hyperlanes(&mut save, &[1, 1], OnMissing::Error).unwrap();
        assert_eq!(a.hyperlanes(&save), vec![Hyperlane { to: 1, length: 50 }]);
        assert_eq!(b.hyperlanes(&save), vec![Hyperlane { to: 0, length: 50 }]);

        // adding again changes nothing
        b.add_hyperlanes(&mut save, &[0], OnMissing::Error).unwrap();
        assert_eq!(a.hyperlanes(&save).len(), 1);
        assert_eq!(b.hyperlanes(&save).len(), 1);

        a.remove_hyperlanes(&mut save, &[1], OnMissing::Error).unwrap();
        assert!(a.hyperlanes(&save).is_empty());
        assert!(b.hyperlanes(&save).is_empty());
    }

    #[test]
    fn missing_neighbour_policies() {
        let mut save = save();
        let a = save.get_system_by_id(0).unwrap();
        let err = a
            .add_hyperlanes(&mut save, &[2, 99], OnMissing::Error)
            .unwrap_err();
        assert_eq!(err.code(), "system-not-found");
        assert!(a.hyperlanes(&save).is_empty());

        a.add_hyperlanes(&mut save, &[2, 99], OnMissing::Ignore).unwrap();
        assert_eq!(a.neighbour_ids(&save), vec![2]);
    }

    #[test]
    fn remove_all_lanes() {
        let mut save = save();
        let a = save.get_system_by_id(0).unwrap();
        a.add_hyperlanes(&mut save, &[1, 2], OnMissing::Error).unwrap();
        a.remove_all_hyperlanes(&mut save, OnMissing::Error).unwrap();
        for system in save.systems().collect::<Vec<_>>() {
            assert!(system.hyperlanes(&save).is_empty());
        }
    }

    #[test]
    fn flags() {
        let mut save = save();
        let a = save.get_system_by_id(0).unwrap();
        assert_eq!(a.precursor_flags(&save), vec!["precursor_1"]);
        assert_eq!(a.flag_names(&save), vec!["precursor_1", "custom"]);

        a.set_flag(&mut save, "precursor_1", false).unwrap();
        a.set_flag(&mut save, "precursor_baol_1", true).unwrap();
        assert_eq!(a.precursor_flags(&save), vec!["precursor_baol_1"]);
        assert_eq!(
            a.flag_value(&save, "precursor_baol_1"),
            Some(Value::from(FLAG_STAMP))
        );
    }

    #[test]
    fn sector_and_starbase() {
        let mut save = save();
        let a = save.get_system_by_id(0).unwrap();
        let b = save.get_system_by_id(1).unwrap();
        assert_eq!(a.sector_id(&save), None);
        assert_eq!(b.sector(&save).unwrap().map(|x| x.id()), Some(2));

        b.set_sector(&mut save, None).unwrap();
        assert_eq!(b.sector_id(&save), None);

        a.set_starbase(&mut save, Some(12)).unwrap();
        assert_eq!(a.starbase_id(&save), Some(12));
        assert_eq!(a.starbase(&save).unwrap_err().code(), "ship-not-found");
        a.set_starbase(&mut save, None).unwrap();
        assert_eq!(a.starbase_id(&save), None);
        assert!(!save.to_strings().1.contains("starbase"));
    }

    #[test]
    fn fleet_presence() {
        let mut save = save();
        let c = save.get_system_by_id(2).unwrap();
        c.register_fleet(&mut save, 5).unwrap();
        c.register_fleet(&mut save, 5).unwrap();
        assert_eq!(c.fleet_presence_ids(&save), vec![5]);
        c.unregister_fleet(&mut save, 5);
        assert!(c.fleet_presence_ids(&save).is_empty());
    }

    #[test]
    fn new_system_gets_next_id() {
        let mut save = save();
        let d = SystemHandle::new(&mut save, "D", &CoordsData::galactic(5.0, 5.0)).unwrap();
        assert_eq!(d.id(), 3);
        assert_eq!(save.get_system_by_name("D").unwrap(), d);
        assert_eq!(d.star_class(&save).as_deref(), Some("sc_g"));
        assert_eq!(d.remove(&mut save).unwrap_err().code(), "not-implemented");
    }

    #[test]
    fn new_system_fails_when_ids_run_out() {
        for last in [UNDEFINED_ID - 1, UNDEFINED_ID] {
            let gamestate = format!(
                "galactic_object={{\n\t{}={{\n\t\tname=\"Edge\"\n\t}}\n}}\n",
                last
            );
            let mut save = StellarisSave::from_strs("", &gamestate).unwrap();
            assert!(save.find_system_by_id(last).is_some());

            let err = SystemHandle::new(&mut save, "D", &CoordsData::galactic(5.0, 5.0))
                .unwrap_err();
            assert_eq!(err.code(), "invalid-state/id-exhausted");
            assert_eq!(save.systems().count(), 1);
            assert_eq!(save.to_strings().1, gamestate);
        }
    }
}
