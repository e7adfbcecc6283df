use super::ship_design::slot_map;
use super::{
    erase, field_f64, field_id, field_text, set_field, set_field_quoted,
    CoordsData, CoordsHandle, FleetHandle, Hitpoints, HitpointsKind, Id, LeaderHandle,
    ShipDesignHandle, SlotMap,
};
use crate::game_data::{ComponentKind, GameDataContext};
use crate::text::{Entry, EntryHandle, ObjectHandle, Tree, Value};
use crate::{EntityKind, Error, StellarisSave};
use log::debug;

/// A `section={ design slot weapon... }` of a ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShipSection {
    entry: EntryHandle,
}

impl ShipSection {
    pub fn entry(&self) -> EntryHandle {
        self.entry
    }

    /// The section template the section was built from
    pub fn design(&self, tree: &Tree) -> Option<String> {
        self.entry.find(tree, "design")?.value(tree).unquoted()
    }

    pub fn set_design(&self, tree: &mut Tree, value: &str) -> Result<(), Error> {
        self.entry.get(tree, "design")?.set_value(tree, Value::quoted(value));
        Ok(())
    }

    pub fn slot(&self, tree: &Tree) -> Option<String> {
        self.entry.find(tree, "slot")?.value(tree).unquoted()
    }

    pub fn weapons(&self, tree: &Tree) -> Vec<ShipWeapon> {
        self.entry
            .get_all(tree, "weapon")
            .into_iter()
            .filter(|x| x.object(tree).is_some())
            .map(|entry| ShipWeapon { entry })
            .collect()
    }
}

/// A `weapon={ index template component_slot }` of a ship section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShipWeapon {
    entry: EntryHandle,
}

impl ShipWeapon {
    /// Position of the weapon across the whole ship
    pub fn index(&self, tree: &Tree) -> Option<u32> {
        self.entry.find(tree, "index")?.value(tree).as_id()
    }

    pub fn template(&self, tree: &Tree) -> Option<String> {
        self.entry.find(tree, "template")?.value(tree).unquoted()
    }

    pub fn set_template(&self, tree: &mut Tree, value: &str) -> Result<(), Error> {
        self.entry.get(tree, "template")?.set_value(tree, Value::quoted(value));
        Ok(())
    }

    pub fn component_slot(&self, tree: &Tree) -> Option<String> {
        self.entry.find(tree, "component_slot")?.value(tree).unquoted()
    }
}

entity_handle!(
    /// An entry of `ships`
    ShipHandle,
    EntityKind::Ship
);

impl ShipHandle {
    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name", "key"])
    }

    /// Renames the ship. `None` drops the name so the game generates one
    pub fn set_name(&self, save: &mut StellarisSave, name: Option<&str>) -> Result<(), Error> {
        match name {
            Some(name) => set_field_quoted(save, self.entry, &["name", "key"], name),
            None => {
                let tree = save.tree_mut();
                if let Some(object) = self.entry.object(tree) {
                    object.remove_all_by_key(tree, "name");
                }
                Ok(())
            }
        }
    }

    pub fn coords(&self, save: &StellarisSave) -> Option<CoordsHandle> {
        let tree = save.tree();
        self.entry
            .find(tree, "coordinate")
            .and_then(|x| x.object(tree))
            .map(CoordsHandle::new)
    }

    pub fn set_coords(&self, save: &mut StellarisSave, coords: &CoordsData) -> Result<(), Error> {
        let tree = save.tree_mut();
        let value = coords.write(tree).value();
        self.entry.get(tree, "coordinate")?.set_value(tree, value);
        Ok(())
    }

    pub fn target_coords(&self, save: &StellarisSave) -> Option<CoordsHandle> {
        let tree = save.tree();
        self.entry
            .find(tree, "target_coordinate")
            .and_then(|x| x.object(tree))
            .map(CoordsHandle::new)
    }

    pub fn set_target_coords(&self, save: &mut StellarisSave, coords: &CoordsData) -> Result<(), Error> {
        let tree = save.tree_mut();
        let value = coords.write(tree).value();
        self.entry.get(tree, "target_coordinate")?.set_value(tree, value);
        Ok(())
    }

    pub fn graphical_culture(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["graphical_culture"])
    }

    pub fn set_graphical_culture(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["graphical_culture"], value)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Build

    pub fn sections(&self, save: &StellarisSave) -> SlotMap<ShipSection> {
        let tree = save.tree();
        slot_map(tree, self.entry.object(tree), "section", |entry| ShipSection { entry })
    }

    /// Sets the section template built in a slot, or removes the section
    /// with `None`. New sections go after the last existing one
    pub fn set_section(
        &self,
        save: &mut StellarisSave,
        slot: &str,
        design: Option<&str>,
    ) -> Result<(), Error> {
        let existing = self.sections(save).get(slot).copied();
        let tree = save.tree_mut();
        let object = self.entry.value_as_object(tree)?;
        match (existing, design) {
            (Some(section), Some(design)) => section.set_design(tree, design)?,
            (Some(section), None) => {
                object.remove_entry(tree, section.entry);
            }
            (None, Some(design)) => {
                let section = ObjectHandle::new(tree.new_object());
                section.push(tree, "design", Value::quoted(design));
                section.push(tree, "slot", Value::quoted(slot));
                let anchor = object
                    .get_all(tree, "section")
                    .last()
                    .copied()
                    .or_else(|| object.find(tree, "graphical_culture"));
                let index = anchor
                    .and_then(|x| object.position(tree, x))
                    .map_or_else(|| object.len(tree), |x| x + 1);
                object.insert(tree, index, Entry::new("section", section.id()));
            }
            (None, None) => {}
        }
        Ok(())
    }

    pub fn next_weapon_index(&self, save: &StellarisSave) -> Option<u32> {
        let tree = save.tree();
        self.entry.find(tree, "next_weapon_index")?.value(tree).as_id()
    }

    ////////////////////////////////////////////////////////////////////////////
    // Status

    fn read_hitpoints(&self, save: &StellarisSave, prefix: &str) -> Hitpoints {
        let mut result = Hitpoints::default();
        for kind in HitpointsKind::ALL {
            let key = hitpoints_key(prefix, kind);
            *result.get_mut(kind) = field_f64(save, self.entry, &[key.as_str()]).unwrap_or(0.0);
        }
        result
    }

    fn write_hitpoints(&self, save: &mut StellarisSave, prefix: &str, value: &Hitpoints) -> Result<(), Error> {
        for kind in HitpointsKind::ALL {
            let key = hitpoints_key(prefix, kind);
            set_field(save, self.entry, &[key.as_str()], value.get(kind))?;
        }
        Ok(())
    }

    /// Current hull, armor and shield
    pub fn hitpoints(&self, save: &StellarisSave) -> Hitpoints {
        self.read_hitpoints(save, "")
    }

    pub fn set_hitpoints(&self, save: &mut StellarisSave, value: &Hitpoints) -> Result<(), Error> {
        self.write_hitpoints(save, "", value)
    }

    pub fn max_hitpoints(&self, save: &StellarisSave) -> Hitpoints {
        self.read_hitpoints(save, "max_")
    }

    pub fn set_max_hitpoints(&self, save: &mut StellarisSave, value: &Hitpoints) -> Result<(), Error> {
        self.write_hitpoints(save, "max_", value)
    }

    pub fn upgrade_progress(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["upgrade_progress"])
    }

    pub fn set_upgrade_progress(&self, save: &mut StellarisSave, value: f64) -> Result<(), Error> {
        set_field(save, self.entry, &["upgrade_progress"], value)
    }

    pub fn experience(&self, save: &StellarisSave) -> f64 {
        field_f64(save, self.entry, &["experience"]).unwrap_or(0.0)
    }

    pub fn set_experience(&self, save: &mut StellarisSave, value: f64) -> Result<(), Error> {
        set_field(save, self.entry, &["experience"], value)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Related

    pub fn fleet_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["fleet"])
    }

    pub fn fleet(&self, save: &StellarisSave) -> Result<Option<FleetHandle>, Error> {
        self.fleet_id(save)
            .map(|id| save.get_fleet_by_id(id))
            .transpose()
    }

    /// Points the ship at a fleet. The fleets' ship lists are left alone,
    /// see [`FleetHandle::add_ship`]
    pub fn set_fleet(&self, save: &mut StellarisSave, fleet: Id) -> Result<(), Error> {
        set_field(save, self.entry, &["fleet"], fleet)
    }

    pub fn design_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["ship_design"])
    }

    pub fn design(&self, save: &StellarisSave) -> Result<Option<ShipDesignHandle>, Error> {
        self.design_id(save)
            .map(|id| save.get_ship_design_by_id(id))
            .transpose()
    }

    pub fn design_upgrade_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["design_upgrade"])
    }

    pub fn design_upgrade(&self, save: &StellarisSave) -> Result<Option<ShipDesignHandle>, Error> {
        self.design_upgrade_id(save)
            .map(|id| save.get_ship_design_by_id(id))
            .transpose()
    }

    pub fn leader_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["leader"])
    }

    pub fn leader(&self, save: &StellarisSave) -> Result<Option<LeaderHandle>, Error> {
        self.leader_id(save)
            .map(|id| save.get_leader_by_id(id))
            .transpose()
    }

    /// Sets or clears the commander. The leader's own location is not
    /// touched, see [`LeaderHandle::set_location`]
    pub fn set_leader(&self, save: &mut StellarisSave, leader: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["leader"], leader)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Lifecycle

    /// Erases the ship and takes it out of its fleet
    pub fn remove(&self, save: &mut StellarisSave) -> Result<(), Error> {
        if let Some(fleet) = self.fleet_id(save).and_then(|id| save.find_fleet_by_id(id)) {
            fleet.remove_ship(save, self.id);
        }
        self.remove_detached(save)
    }

    /// Erases the ship without touching its fleet, for when the fleet goes
    /// away too
    pub(crate) fn remove_detached(&self, save: &mut StellarisSave) -> Result<(), Error> {
        if let Some(leader) = self.leader_id(save).and_then(|id| save.find_leader_by_id(id)) {
            leader.unassign(save)?;
        }

        erase(save, self.entry);
        save.ships.remove(&self.id);
        Ok(())
    }

    /// Builds a new ship from a design of the same save and puts it into a
    /// fleet. The ship starts at full health, at the fleet's position.
    pub fn new_from_design(
        save: &mut StellarisSave,
        design: Id,
        fleet: Id,
        name: Option<&str>,
        game: &mut GameDataContext,
    ) -> Result<ShipHandle, Error> {
        let fleet = save.get_fleet_by_id(fleet)?;
        let country = fleet.find_owner(save)?;
        let design = save.get_ship_design_by_id(design)?;
        let hitpoints = design.calculate_max_hitpoints(save, game)?;

        // resolve everything against game data before the save is touched
        let tree = save.tree();
        let mut sections = Vec::new();
        for section in design.sections(save).values() {
            let mut weapons = Vec::new();
            for component in section.components(tree).values() {
                let template = match component.template(tree) {
                    Some(x) => x,
                    None => continue,
                };

                if game.component_template(&template)?.kind == ComponentKind::Weapon {
                    weapons.push((template, component.slot(tree).unwrap_or_default()));
                }
            }
            let template = section.template(tree).unwrap_or_default();
            let slot = section.slot(tree).unwrap_or_default();
            sections.push((template, slot, weapons));
        }

        let coords = fleet
            .coords(save)
            .map(|x| x.data(save.tree()))
            .unwrap_or_else(|| CoordsData::galactic(0.0, 0.0));
        let culture = country.graphical_culture(save).unwrap_or_default();

        let id = save.allocate_counter_id("last_created_ship", |save, id| {
            save.find_ship_by_id(id).is_some()
        })?;
        let name = name.map_or_else(|| format!("Ship ID {}", id), String::from);
        debug!(
            "Adding new ship ID {} named '{}' for country ID {}",
            id,
            name,
            country.id()
        );

        let tree = save.tree_mut();
        let object = ObjectHandle::new(tree.new_object());
        object.push(tree, "fleet", fleet.id());
        let name_object = object.push_object(tree, "name");
        name_object.push(tree, "key", Value::quoted(&name));
        object.push(tree, "reserve", 0u32);
        object.push(tree, "ship_design", design.id());
        object.push(tree, "graphical_culture", Value::quoted(&culture));

        let mut weapon_index = 0u32;
        for (template, slot, weapons) in sections {
            let section = object.push_object(tree, "section");
            section.push(tree, "design", Value::quoted(&template));
            section.push(tree, "slot", Value::quoted(&slot));
            for (template, slot) in weapons {
                let weapon = section.push_object(tree, "weapon");
                weapon.push(tree, "index", weapon_index);
                weapon.push(tree, "template", Value::quoted(&template));
                weapon.push(tree, "component_slot", Value::quoted(&slot));
                weapon_index += 1;
            }
        }

        let position = coords.write(tree).value();
        object.push(tree, "coordinate", position);
        let target = coords.write(tree).value();
        object.push(tree, "target_coordinate", target);
        object.push(tree, "post_move_angle", 0u32);
        for prefix in ["", "max_"] {
            for kind in [HitpointsKind::Hull, HitpointsKind::Shield, HitpointsKind::Armor] {
                object.push(tree, hitpoints_key(prefix, kind), hitpoints.get(kind));
            }
        }
        object.push(tree, "rotation", 0u32);
        object.push(tree, "forward_x", 1u32);
        object.push(tree, "forward_y", 0u32);
        object.push(tree, "upgrade_progress", 0u32);
        object.push(tree, "next_weapon_index", weapon_index);

        let entry = save.push_entity(&["ships"], id, object)?;
        let ship = ShipHandle { id, entry };
        save.ships.insert(id, ship);
        fleet.add_ship(save, id)?;
        Ok(ship)
    }

    /// Like [`new_from_design`](ShipHandle::new_from_design) with a design
    /// from another save, which is copied over first
    pub fn new_from_foreign_design(
        source: &StellarisSave,
        design: ShipDesignHandle,
        save: &mut StellarisSave,
        fleet: Id,
        name: Option<&str>,
        game: &mut GameDataContext,
    ) -> Result<ShipHandle, Error> {
        save.get_fleet_by_id(fleet)?.find_owner(save)?;
        let copy = design.copy_to(source, save)?;
        ShipHandle::new_from_design(save, copy.id(), fleet, name, game)
    }
}

/// eg: `max_armor_hitpoints`. Hull is the bare `hitpoints`
fn hitpoints_key(prefix: &str, kind: HitpointsKind) -> String {
    match kind {
        HitpointsKind::Hull => format!("{}hitpoints", prefix),
        kind => format!("{}{}_hitpoints", prefix, kind.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
last_created_ship=101
last_created_design=40
ships={
	100={
		fleet=7
		name={ key="Explorer" }
		ship_design=40
		graphical_culture="mammalian_01"
		section={
			design="CORVETTE_MID_M1S2"
			slot="mid"
			weapon={ index=0 template="SMALL_MASS_DRIVER_1" component_slot="SMALL_GUN_01" }
		}
		coordinate={ x=10 y=20 origin=3 }
		hitpoints=250 shield_hitpoints=40 armor_hitpoints=50
		max_hitpoints=330 max_shield_hitpoints=40 max_armor_hitpoints=50
		leader=20
		next_weapon_index=1
	}
	101={ fleet=7 ship_design=40 }
}
fleet={
	7={
		name={ key="First Fleet" }
		ships={ 100 101 }
		movement_manager={ coordinate={ x=10 y=20 origin=3 } }
	}
}
ship_design={
	40={
		name={ key="Warden" }
		ship_size="corvette"
		section={
			template="CORVETTE_MID_M1S2"
			slot="mid"
			component={ slot="SMALL_GUN_01" template="SMALL_MASS_DRIVER_1" }
			component={ slot="SMALL_UTILITY_1" template="SMALL_ARMOR_1" }
		}
		section={
			template="CORVETTE_STERN_S1"
			slot="stern"
		}
	}
}
leaders={
	20={ country=0 location={ type=ship id=100 area=none assignment=none } }
}
country={
	0={
		graphical_culture="mammalian_01"
		capital=10
		fleets_manager={ owned_fleets={ { fleet=7 ownership_status=normal } } }
		owned_leaders={ 20 }
	}
}
"#;

    fn game() -> GameDataContext {
        let mut game = GameDataContext::new(None);
        game.insert_source(
            crate::game_data::SHIP_SIZES,
            "corvette = { max_hitpoints = 300 }",
        )
        .unwrap();
        game.insert_source(
            crate::game_data::COMPONENT_TEMPLATES,
            r#"
utility_component_template = { key = "SMALL_ARMOR_1" modifier = { ship_armor_add = 50 ship_hull_mult = 0.1 } }
weapon_component_template = { key = "SMALL_MASS_DRIVER_1" }
"#,
        )
        .unwrap();
        game
    }

    #[test]
    fn read_ship() {
        let save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ship = save.get_ship_by_id(100).unwrap();
        let tree = save.tree();
        assert_eq!(ship.name(&save).as_deref(), Some("Explorer"));
        assert_eq!(ship.fleet_id(&save), Some(7));
        assert_eq!(ship.design(&save).unwrap().map(|x| x.id()), Some(40));
        assert_eq!(ship.experience(&save), 0.0);
        assert_eq!(
            ship.hitpoints(&save),
            Hitpoints {
                hull: 250.0,
                armor: 50.0,
                shield: 40.0
            }
        );

        let sections = ship.sections(&save);
        let mid = sections.get("mid").unwrap();
        assert_eq!(mid.design(tree).as_deref(), Some("CORVETTE_MID_M1S2"));
        let weapons = mid.weapons(tree);
        assert_eq!(weapons.len(), 1);
        assert_eq!(weapons[0].index(tree), Some(0));
        assert_eq!(weapons[0].component_slot(tree).as_deref(), Some("SMALL_GUN_01"));
    }

    #[test]
    fn name_can_be_dropped() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ship = save.get_ship_by_id(100).unwrap();
        ship.set_name(&mut save, None).unwrap();
        assert_eq!(ship.name(&save), None);
        ship.set_name(&mut save, Some("Renamed")).unwrap();
        assert_eq!(ship.name(&save).as_deref(), Some("Renamed"));
    }

    #[test]
    fn remove_updates_fleet_and_leader() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ship = save.get_ship_by_id(100).unwrap();
        ship.remove(&mut save).unwrap();

        assert!(save.find_ship_by_id(100).is_none());
        assert_eq!(save.get_fleet_by_id(7).unwrap().ship_ids(&save), vec![101]);
        let leader = save.get_leader_by_id(20).unwrap();
        assert_eq!(leader.location(&save), Some(crate::handles::LeaderLocation::Planet(10)));
        assert!(!save.to_strings().1.contains("Explorer"));
    }

    #[test]
    fn new_ship_from_design() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ship = ShipHandle::new_from_design(&mut save, 40, 7, None, &mut game()).unwrap();
        assert_eq!(ship.id(), 102);
        assert_eq!(ship.name(&save).as_deref(), Some("Ship ID 102"));
        assert_eq!(ship.graphical_culture(&save).as_deref(), Some("mammalian_01"));
        assert_eq!(ship.next_weapon_index(&save), Some(1));
        assert_eq!(
            ship.max_hitpoints(&save),
            Hitpoints {
                hull: 330.0,
                armor: 50.0,
                shield: 0.0
            }
        );
        assert_eq!(ship.hitpoints(&save), ship.max_hitpoints(&save));
        assert_eq!(
            ship.coords(&save).map(|x| x.data(save.tree())),
            Some(CoordsData::new(10.0, 20.0, 3))
        );
        assert_eq!(
            ship.sections(&save).slots().collect::<Vec<_>>(),
            vec!["mid", "stern"]
        );
        assert_eq!(
            save.get_fleet_by_id(7).unwrap().ship_ids(&save),
            vec![100, 101, 102]
        );
        assert!(save.to_strings().1.contains("last_created_ship=102"));
    }

    #[test]
    fn new_ship_needs_game_data() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let mut game = GameDataContext::new(None);
        game.insert_source(crate::game_data::SHIP_SIZES, "corvette = { max_hitpoints = 300 }")
            .unwrap();
        game.insert_source(crate::game_data::COMPONENT_TEMPLATES, "")
            .unwrap();
        let err = ShipHandle::new_from_design(&mut save, 40, 7, None, &mut game).unwrap_err();
        assert_eq!(err.code(), "game-data/component-template-not-found");
        assert!(save.find_ship_by_id(102).is_none());
        assert!(save.to_strings().1.contains("last_created_ship=101"));
    }

    #[test]
    fn set_section_appends_after_sections() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ship = save.get_ship_by_id(100).unwrap();
        ship.set_section(&mut save, "stern", Some("CORVETTE_STERN_S1")).unwrap();
        assert_eq!(ship.sections(&save).slots().collect::<Vec<_>>(), vec!["mid", "stern"]);
        ship.set_section(&mut save, "mid", None).unwrap();
        assert_eq!(ship.sections(&save).slots().collect::<Vec<_>>(), vec!["stern"]);
    }
}
