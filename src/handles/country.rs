use super::{
    field_id, field_ids, field_text, field_texts, push_id, remove_id, set_field,
    set_field_quoted, set_field_texts, FleetHandle, FleetTemplateHandle, Id, LeaderHandle,
    PlanetHandle, ScienceArea, SectorHandle, ShipDesignHandle, SystemHandle, UNDEFINED_ID,
};
use crate::save::CountryRemoval;
use crate::text::{Entry, EntryHandle, ObjectHandle, Value};
use crate::{EntityKind, Error, ErrorKind, StellarisSave};
use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One record of `fleets_manager.owned_fleets`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FleetOwnership {
    pub fleet: Id,
    pub ownership_status: Option<String>,

    /// The country the fleet returns to when this ownership ends
    pub previous_owner: Option<Id>,
}

entity_handle!(
    /// An entry of `country`
    CountryHandle,
    EntityKind::Country
);

impl CountryHandle {
    /// The localization key of the name
    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name", "key"])
    }

    pub fn set_name(&self, save: &mut StellarisSave, name: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["name", "key"], name)
    }

    /// eg: `default`, `fallen_empire`, `primitive`
    pub fn country_type(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["type"])
    }

    pub fn set_country_type(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["type"], value)
    }

    pub fn personality(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["personality"])
    }

    pub fn set_personality(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["personality"], value)
    }

    pub fn ethos(&self, save: &StellarisSave) -> Vec<String> {
        field_texts(save, self.entry, &["ethos"])
    }

    pub fn set_ethos(&self, save: &mut StellarisSave, ethics: &[&str]) -> Result<(), Error> {
        set_field_texts(save, self.entry, &["ethos"], Some("ethic"), ethics)
    }

    pub fn government_type(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["government", "type"])
    }

    pub fn set_government_type(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["government", "type"], value)
    }

    pub fn civics(&self, save: &StellarisSave) -> Vec<String> {
        field_texts(save, self.entry, &["government", "civics"])
    }

    pub fn set_civics(&self, save: &mut StellarisSave, civics: &[&str]) -> Result<(), Error> {
        set_field_texts(save, self.entry, &["government", "civics"], None, civics)
    }

    pub fn origin(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["government", "origin"])
    }

    pub fn set_origin(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["government", "origin"], value)
    }

    /// Graphical culture of the ships
    pub fn graphical_culture(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["graphical_culture"])
    }

    pub fn set_graphical_culture(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["graphical_culture"], value)
    }

    pub fn city_graphical_culture(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["city_graphical_culture"])
    }

    pub fn set_city_graphical_culture(
        &self,
        save: &mut StellarisSave,
        value: &str,
    ) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["city_graphical_culture"], value)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Planets and systems

    pub fn capital_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["capital"])
    }

    pub fn capital(&self, save: &StellarisSave) -> Result<Option<PlanetHandle>, Error> {
        self.capital_id(save)
            .map(|id| save.get_planet_by_id(id))
            .transpose()
    }

    pub fn set_capital(&self, save: &mut StellarisSave, planet: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["capital"], planet)
    }

    pub fn owned_planet_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["owned_planets"])
    }

    /// Owned planets that still exist
    pub fn owned_planets(&self, save: &StellarisSave) -> Vec<PlanetHandle> {
        self.owned_planet_ids(save)
            .into_iter()
            .filter_map(|id| save.find_planet_by_id(id))
            .collect()
    }

    pub fn set_owned_planets(&self, save: &mut StellarisSave, planets: &[Id]) -> Result<(), Error> {
        let tree = save.tree_mut();
        let field = self.entry.get(tree, "owned_planets")?;
        let list = ObjectHandle::new(tree.new_object());
        field.set_value(tree, list.id());
        for &planet in planets {
            list.push_value(tree, planet);
        }
        Ok(())
    }

    pub fn starting_system_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["starting_system"])
    }

    pub fn starting_system(&self, save: &StellarisSave) -> Option<SystemHandle> {
        self.starting_system_id(save)
            .and_then(|id| save.find_system_by_id(id))
    }

    /// Systems charted by the country, in ascending id order
    pub fn visible_system_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["terra_incognita", "systems"])
    }

    /// Charts a system. Returns false when it was already charted
    pub fn add_system_visibility(&self, save: &mut StellarisSave, system: Id) -> Result<bool, Error> {
        let tree = save.tree_mut();
        let list = self
            .entry
            .get_path(tree, &["terra_incognita", "systems"])?
            .value_as_object(tree)?;

        let view = &*tree;
        let ids: Vec<Option<Id>> = list
            .entries(view)
            .map(|e| e.value(view).as_id().filter(|_| e.key(view).is_none()))
            .collect();

        match ids.iter().position(|x| x.map_or(false, |x| x >= system)) {
            Some(index) if ids[index] == Some(system) => return Ok(false),
            Some(index) => {
                list.insert(tree, index, Entry::element(system));
            }
            None => {
                list.push_value(tree, system);
            }
        }

        Ok(true)
    }

    pub fn remove_system_visibility(&self, save: &mut StellarisSave, system: Id) -> bool {
        remove_id(save, self.entry, &["terra_incognita", "systems"], system)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Leaders

    pub fn owned_leader_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["owned_leaders"])
    }

    pub fn owned_leaders(&self, save: &StellarisSave) -> Result<Vec<LeaderHandle>, Error> {
        self.owned_leader_ids(save)
            .into_iter()
            .map(|id| save.get_leader_by_id(id))
            .collect()
    }

    fn check_owned_leader(&self, save: &StellarisSave, leader: Id, role: &str) -> Result<(), Error> {
        if self.owned_leader_ids(save).contains(&leader) {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::NotOwnedLeader {
                country: self.id,
                leader,
                role: role.to_owned(),
            }))
        }
    }

    /// Adds a leader to the country's pool and points the leader back at the
    /// country
    pub fn add_leader(&self, save: &mut StellarisSave, leader: Id) -> Result<(), Error> {
        let handle = save.get_leader_by_id(leader)?;
        push_id(save, self.entry, &["owned_leaders"], leader)?;
        if handle.country_id(save) != Some(self.id) {
            handle.set_country(save, self.id)?;
        }
        Ok(())
    }

    /// Drops a leader from the pool, and from the ruler and head scientist
    /// roles. Returns false when the leader was not in the pool
    pub fn remove_leader(&self, save: &mut StellarisSave, leader: Id) -> Result<bool, Error> {
        if !remove_id(save, self.entry, &["owned_leaders"], leader) {
            return Ok(false);
        }

        self.clear_leader_roles(save, leader)?;
        Ok(true)
    }

    pub(crate) fn clear_leader_roles(&self, save: &mut StellarisSave, leader: Id) -> Result<(), Error> {
        if self.ruler_id(save) == Some(leader) {
            self.set_ruler(save, None)?;
        }

        for area in ScienceArea::ALL {
            if self.scientist_leader_id(save, area) == Some(leader) {
                self.set_scientist_leader(save, area, None)?;
            }
        }
        Ok(())
    }

    pub fn ruler_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["ruler"])
    }

    pub fn ruler(&self, save: &StellarisSave) -> Result<Option<LeaderHandle>, Error> {
        self.ruler_id(save)
            .map(|id| save.get_leader_by_id(id))
            .transpose()
    }

    /// The ruler must come from the country's own leaders
    pub fn set_ruler(&self, save: &mut StellarisSave, leader: Option<Id>) -> Result<(), Error> {
        if let Some(leader) = leader {
            self.check_owned_leader(save, leader, "ruler")?;
        }

        set_field(save, self.entry, &["ruler"], leader)
    }

    pub fn scientist_leader_id(&self, save: &StellarisSave, area: ScienceArea) -> Option<Id> {
        field_id(save, self.entry, &["tech_status", "leaders", area.name()])
    }

    pub fn scientist_leader(
        &self,
        save: &StellarisSave,
        area: ScienceArea,
    ) -> Result<Option<LeaderHandle>, Error> {
        self.scientist_leader_id(save, area)
            .map(|id| save.get_leader_by_id(id))
            .transpose()
    }

    /// The head scientist must come from the country's own leaders
    pub fn set_scientist_leader(
        &self,
        save: &mut StellarisSave,
        area: ScienceArea,
        leader: Option<Id>,
    ) -> Result<(), Error> {
        if let Some(leader) = leader {
            let role = format!("{} science leader", area.name());
            self.check_owned_leader(save, leader, &role)?;
        }

        let path = ["tech_status", "leaders", area.name()];
        set_field(save, self.entry, &path, leader.unwrap_or(UNDEFINED_ID))
    }

    ////////////////////////////////////////////////////////////////////////////
    // Fleets

    fn owned_fleets_list(&self, save: &StellarisSave) -> Option<ObjectHandle> {
        let tree = save.tree();
        self.entry
            .find_path(tree, &["fleets_manager", "owned_fleets"])?
            .object(tree)
    }

    fn find_ownership(&self, save: &StellarisSave, fleet: Id) -> Option<EntryHandle> {
        let tree = save.tree();
        self.owned_fleets_list(save)?.live_entries(tree).find(|e| {
            e.find(tree, "fleet")
                .and_then(|x| x.value(tree).as_id())
                .map_or(false, |x| x == fleet)
        })
    }

    pub fn fleet_ownerships(&self, save: &StellarisSave) -> Vec<FleetOwnership> {
        let tree = save.tree();
        let list = match self.owned_fleets_list(save) {
            Some(x) => x,
            None => return Vec::new(),
        };

        list.live_entries(tree)
            .filter_map(|e| {
                let fleet = e.find(tree, "fleet")?.value(tree).as_id()?;
                let ownership_status = e
                    .find(tree, "ownership_status")
                    .and_then(|x| x.value(tree).unquoted());
                let previous_owner = e
                    .find(tree, "previous_owner")
                    .and_then(|x| x.value(tree).as_id())
                    .filter(|&x| x != UNDEFINED_ID);
                Some(FleetOwnership {
                    fleet,
                    ownership_status,
                    previous_owner,
                })
            })
            .collect()
    }

    pub fn owned_fleet_ids(&self, save: &StellarisSave) -> Vec<Id> {
        self.fleet_ownerships(save)
            .into_iter()
            .map(|x| x.fleet)
            .collect()
    }

    pub fn owned_fleets(&self, save: &StellarisSave) -> Result<Vec<FleetHandle>, Error> {
        self.owned_fleet_ids(save)
            .into_iter()
            .map(|id| save.get_fleet_by_id(id))
            .collect()
    }

    /// Records the fleet as owned. Returns false when it already was
    pub fn register_owned_fleet(&self, save: &mut StellarisSave, fleet: Id) -> Result<bool, Error> {
        if self.find_ownership(save, fleet).is_some() {
            return Ok(false);
        }

        let tree = save.tree_mut();
        let list = self
            .entry
            .get_path(tree, &["fleets_manager", "owned_fleets"])?
            .value_as_object(tree)?;
        let record = list.push_element_object(tree);
        record.push(tree, "fleet", fleet);
        record.push(tree, "ownership_status", Value::word("normal"));
        Ok(true)
    }

    /// Ends the country's ownership of the fleet. A fleet with a previous
    /// owner goes back to it
    pub fn unregister_owned_fleet(&self, save: &mut StellarisSave, fleet: Id) -> Result<(), Error> {
        let record = match self.find_ownership(save, fleet) {
            Some(x) => x,
            None => return Ok(()),
        };

        let previous = self
            .fleet_ownerships(save)
            .into_iter()
            .find(|x| x.fleet == fleet)
            .and_then(|x| x.previous_owner);

        if let Some(previous) = previous {
            match save.find_country_by_id(previous) {
                Some(country) => {
                    country.register_owned_fleet(save, fleet)?;
                }
                None => warn!(
                    "previous owner {} of fleet {} does not exist",
                    previous, fleet
                ),
            }
        }

        if let Some(list) = self.owned_fleets_list(save) {
            list.remove_entry(save.tree_mut(), record);
        }
        Ok(())
    }

    /// Drops the ownership record without handing the fleet back, for fleets
    /// that are going away
    pub(crate) fn forget_owned_fleet(&self, save: &mut StellarisSave, fleet: Id) -> bool {
        let record = self.find_ownership(save, fleet);
        match (self.owned_fleets_list(save), record) {
            (Some(list), Some(record)) => list.remove_entry(save.tree_mut(), record),
            _ => false,
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Fleet templates

    pub fn fleet_template_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["fleet_template_manager", "fleet_template"])
    }

    pub fn fleet_templates(&self, save: &StellarisSave) -> Result<Vec<FleetTemplateHandle>, Error> {
        self.fleet_template_ids(save)
            .into_iter()
            .map(|id| save.get_fleet_template_by_id(id))
            .collect()
    }

    pub fn register_fleet_template(&self, save: &mut StellarisSave, template: Id) -> Result<bool, Error> {
        push_id(
            save,
            self.entry,
            &["fleet_template_manager", "fleet_template"],
            template,
        )
    }

    pub fn unregister_fleet_template(&self, save: &mut StellarisSave, template: Id) -> bool {
        remove_id(
            save,
            self.entry,
            &["fleet_template_manager", "fleet_template"],
            template,
        )
    }

    ////////////////////////////////////////////////////////////////////////////
    // Sectors

    pub fn owned_sector_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["sectors", "owned"])
    }

    pub fn owned_sectors(&self, save: &StellarisSave) -> Result<Vec<SectorHandle>, Error> {
        self.owned_sector_ids(save)
            .into_iter()
            .map(|id| save.get_sector_by_id(id))
            .collect()
    }

    /// Takes ownership of a sector. The previous owner's list is not updated
    pub fn add_sector(&self, save: &mut StellarisSave, sector: Id) -> Result<bool, Error> {
        let handle = save.get_sector_by_id(sector)?;
        let added = push_id(save, self.entry, &["sectors", "owned"], sector)?;
        handle.set_owner(save, self.id)?;
        Ok(added)
    }

    pub fn remove_sector(&self, save: &mut StellarisSave, sector: Id) -> bool {
        remove_id(save, self.entry, &["sectors", "owned"], sector)
    }

    pub fn ship_designs(&self) -> ShipDesignCollection {
        ShipDesignCollection {
            country: self.entry,
        }
    }

    /// Removes the country along with what it owns
    pub fn remove(&self, save: &mut StellarisSave, removal: CountryRemoval) -> Result<(), Error> {
        crate::save::remove_country(save, *self, removal)
    }
}

/// A country's `ship_design_collection`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipDesignCollection {
    country: EntryHandle,
}

impl ShipDesignCollection {
    pub fn auto_gen_design(&self, save: &StellarisSave) -> bool {
        let tree = save.tree();
        self.country
            .find_path(tree, &["ship_design_collection", "auto_gen_design"])
            .and_then(|x| x.value(tree).as_bool())
            .unwrap_or(false)
    }

    pub fn set_auto_gen_design(&self, save: &mut StellarisSave, value: bool) -> Result<(), Error> {
        let path = ["ship_design_collection", "auto_gen_design"];
        set_field(save, self.country, &path, value)
    }

    pub fn design_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.country, &["ship_design_collection", "ship_design"])
    }

    /// Listed designs that exist in the save
    pub fn designs(&self, save: &StellarisSave) -> Vec<ShipDesignHandle> {
        self.design_ids(save)
            .into_iter()
            .filter_map(|id| {
                let design = save.find_ship_design_by_id(id);
                if design.is_none() {
                    warn!("ship design {} is listed in a collection but does not exist", id);
                }
                design
            })
            .collect()
    }

    pub fn find_by_id(&self, save: &StellarisSave, id: Id) -> Option<ShipDesignHandle> {
        self.designs(save).into_iter().find(|x| x.id() == id)
    }

    /// Case insensitive
    pub fn find_by_name(&self, save: &StellarisSave, name: &str) -> Option<ShipDesignHandle> {
        self.designs(save).into_iter().find(|x| {
            x.name(save)
                .map_or(false, |x| x.to_lowercase() == name.to_lowercase())
        })
    }

    pub fn add_design(&self, save: &mut StellarisSave, design: Id) -> Result<bool, Error> {
        push_id(
            save,
            self.country,
            &["ship_design_collection", "ship_design"],
            design,
        )
    }

    pub fn remove_design(&self, save: &mut StellarisSave, design: Id) -> bool {
        remove_id(
            save,
            self.country,
            &["ship_design_collection", "ship_design"],
            design,
        )
    }
}
