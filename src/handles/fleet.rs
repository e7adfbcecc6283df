use super::{
    erase, field_f64, field_id, field_ids, field_text, push_id, remove_id, set_field,
    set_field_quoted, CoordsData, CoordsHandle, CountryHandle, EntityHandle, FleetTemplateHandle,
    Id, ShipHandle, GALAXY_ORIGIN,
};
use crate::game_data::GameDataContext;
use crate::text::{ObjectHandle, Value};
use crate::{Error, EntityKind, StellarisSave};
use log::{debug, warn};

/// `movement_manager.target.target.type` of a fleet chasing another fleet
const TARGET_FLEET: u32 = 3;

/// How much of a fleet's surroundings to remove with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FleetRemoval {
    /// Also erase the fleet's template instead of only unlinking it
    pub remove_template: bool,
}

entity_handle!(
    /// An entry of `fleet`
    FleetHandle,
    EntityKind::Fleet
);

impl FleetHandle {
    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name", "key"])
    }

    pub fn set_name(&self, save: &mut StellarisSave, name: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["name", "key"], name)
    }

    /// Starbases are stations
    pub fn is_station(&self, save: &StellarisSave) -> bool {
        let tree = save.tree();
        self.entry
            .find(tree, "station")
            .and_then(|x| x.value(tree).as_bool())
            .unwrap_or(false)
    }

    pub fn set_station(&self, save: &mut StellarisSave, station: bool) -> Result<(), Error> {
        let value = if station { Value::from(true) } else { Value::Absent };
        set_field(save, self.entry, &["station"], value)
    }

    /// Approximate position of the fleet
    pub fn coords(&self, save: &StellarisSave) -> Option<CoordsHandle> {
        let tree = save.tree();
        self.entry
            .find_path(tree, &["movement_manager", "coordinate"])
            .and_then(|x| x.object(tree))
            .map(CoordsHandle::new)
    }

    pub fn set_coords(&self, save: &mut StellarisSave, coords: &CoordsData) -> Result<(), Error> {
        let tree = save.tree_mut();
        let value = coords.write(tree).value();
        self.entry
            .get_path(tree, &["movement_manager", "coordinate"])?
            .set_value(tree, value);
        Ok(())
    }

    /// Moves the fleet to the centroid of its ships. A fleet without ships
    /// (still under construction) is left alone
    pub fn update_coords_to_ships_average(&self, save: &mut StellarisSave) -> Result<(), Error> {
        let tree = save.tree();
        let points: Vec<_> = self
            .ships(save)?
            .into_iter()
            .filter_map(|ship| ship.coords(save))
            .map(|x| x.data(tree))
            .collect();

        match CoordsData::average(&points) {
            Some(center) => self.set_coords(save, &center),
            None => Ok(()),
        }
    }

    /// Refreshes `hit_points` as the sum of the ships' hull
    pub fn update_hitpoints(&self, save: &mut StellarisSave) -> Result<(), Error> {
        let total: f64 = self
            .ships(save)?
            .into_iter()
            .map(|ship| ship.hitpoints(save).hull)
            .sum();
        set_field(save, self.entry, &["hit_points"], total)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Combat

    pub fn combat_fleet_ids(&self, save: &StellarisSave) -> Vec<Id> {
        let tree = save.tree();
        self.entry
            .find_path(tree, &["combat", "in_combat_with"])
            .and_then(|x| x.object(tree))
            .map(|list| {
                list.live_entries(tree)
                    .filter_map(|e| e.find(tree, "fleet")?.value(tree).as_id())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn fleets_in_combat_with(&self, save: &StellarisSave) -> Result<Vec<FleetHandle>, Error> {
        self.combat_fleet_ids(save)
            .into_iter()
            .map(|id| save.get_fleet_by_id(id))
            .collect()
    }

    fn push_combat(&self, save: &mut StellarisSave, other: Id) -> Result<(), Error> {
        if self.combat_fleet_ids(save).contains(&other) {
            return Ok(());
        }

        let tree = save.tree_mut();
        let list = self
            .entry
            .get_path(tree, &["combat", "in_combat_with"])?
            .value_as_object(tree)?;
        let record = list.push_element_object(tree);
        record.push(tree, "fleet", other);
        Ok(())
    }

    /// Records where and when the combat started, unless already recorded
    fn mark_combat_start(&self, save: &mut StellarisSave, date: Option<&str>) -> Result<(), Error> {
        let started = field_id(save, self.entry, &["combat", "start_coordinate", "origin"]);
        if started.map_or(false, |x| x != GALAXY_ORIGIN) {
            return Ok(());
        }

        let here = match self.coords(save) {
            Some(x) => x.data(save.tree()),
            None => return Ok(()),
        };

        let tree = save.tree_mut();
        let value = here.write(tree).value();
        self.entry
            .get_path(tree, &["combat", "start_coordinate"])?
            .set_value(tree, value);
        if let Some(date) = date {
            set_field(save, self.entry, &["combat", "start_date"], Value::word(date))?;
        }
        Ok(())
    }

    /// Puts two fleets in combat with each other. Repeated calls change
    /// nothing
    pub fn combat(&self, save: &mut StellarisSave, other: Id) -> Result<(), Error> {
        let other = save.get_fleet_by_id(other)?;
        let date = save.date_raw();

        self.push_combat(save, other.id)?;
        other.push_combat(save, self.id)?;
        self.mark_combat_start(save, date.as_deref())?;
        other.mark_combat_start(save, date.as_deref())
    }

    ////////////////////////////////////////////////////////////////////////////
    // Orders

    /// Sends the fleet after another fleet
    pub fn order_attack(&self, save: &mut StellarisSave, target: Id) -> Result<(), Error> {
        save.get_fleet_by_id(target)?;

        let tree = save.tree_mut();
        let chase = ObjectHandle::new(tree.new_object());
        chase.push(tree, "type", TARGET_FLEET);
        chase.push(tree, "id", target);
        self.entry
            .get_path(tree, &["movement_manager", "target", "target"])?
            .set_value(tree, chase.id());

        let follow = ObjectHandle::new(tree.new_object());
        follow.push(tree, "fleet", target);
        follow.push(tree, "attack_when_in_range", Value::from(true));
        follow.push(tree, "order_id", 0u32);
        self.entry
            .get_path(tree, &["current_order", "follow_order"])?
            .set_value(tree, follow.id());

        set_field(save, self.entry, &["order_id"], 1u32)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Related

    pub fn template_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["fleet_template"])
    }

    pub fn template(&self, save: &StellarisSave) -> Result<Option<FleetTemplateHandle>, Error> {
        self.template_id(save)
            .map(|id| save.get_fleet_template_by_id(id))
            .transpose()
    }

    pub fn set_template(&self, save: &mut StellarisSave, template: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["fleet_template"], template)
    }

    fn owner(&self, save: &StellarisSave) -> Option<CountryHandle> {
        save.countries
            .values()
            .copied()
            .find(|c| c.owned_fleet_ids(save).contains(&self.id))
    }

    /// The country listing the fleet among its owned fleets
    pub fn find_owner(&self, save: &StellarisSave) -> Result<CountryHandle, Error> {
        self.owner(save).ok_or_else(|| {
            Error::invalid_state(
                "invalid-state/fleet/no-owner",
                format!("fleet {} has no owner", self.id),
            )
        })
    }

    pub fn ship_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["ships"])
    }

    pub fn ships(&self, save: &StellarisSave) -> Result<Vec<ShipHandle>, Error> {
        self.ship_ids(save)
            .into_iter()
            .map(|id| save.get_ship_by_id(id))
            .collect()
    }

    /// Moves a ship into the fleet, out of whatever fleet it was in. Returns
    /// false when it already was listed here
    pub fn add_ship(&self, save: &mut StellarisSave, ship: Id) -> Result<bool, Error> {
        let ship = save.get_ship_by_id(ship)?;
        if !push_id(save, self.entry, &["ships"], ship.id())? {
            return Ok(false);
        }

        let previous = ship.fleet_id(save);
        if previous != Some(self.id) {
            if let Some(fleet) = previous.and_then(|id| save.find_fleet_by_id(id)) {
                fleet.remove_ship(save, ship.id());
            }
            ship.set_fleet(save, self.id)?;
        }
        Ok(true)
    }

    /// Unlists a ship. The ship should then join another fleet or be removed
    pub fn remove_ship(&self, save: &mut StellarisSave, ship: Id) -> bool {
        remove_id(save, self.entry, &["ships"], ship)
    }

    /// Leaves the planet or starbase the fleet orbits, freeing its orbital
    /// slot on the planet
    pub fn unassign_orbit(&self, save: &mut StellarisSave) -> Result<(), Error> {
        let orbit = &["movement_manager", "orbit"];
        let index = field_f64(save, self.entry, &["movement_manager", "orbit", "index"])
            .filter(|&x| x >= 0.0)
            .map(|x| x as u32);

        if let Some(index) = index {
            let starbase_planet = field_id(
                save,
                self.entry,
                &["movement_manager", "orbit", "orbitable", "starbase"],
            )
            .and_then(|id| save.find_ship_by_id(id))
            .and_then(|ship| {
                field_id(
                    save,
                    ship.entry(),
                    &["movement_manager", "orbit", "orbitable", "planet"],
                )
            });
            let planet = field_id(
                save,
                self.entry,
                &["movement_manager", "orbit", "orbitable", "planet"],
            );

            for planet in [starbase_planet, planet].into_iter().flatten() {
                let planet = match save.find_planet_by_id(planet) {
                    Some(x) => x,
                    None => continue,
                };

                let tree = save.tree_mut();
                if let Some(slot) = planet
                    .entry()
                    .find_path(tree, &["planet_orbitals"])
                    .and_then(|x| x.find(tree, index))
                {
                    slot.set_value(tree, Value::Absent);
                }
            }
        }

        let tree = save.tree_mut();
        let empty = tree.new_object();
        self.entry.get_path(tree, orbit)?.set_value(tree, empty);
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////
    // Lifecycle

    /// Erases the fleet with its ships, unlinking it from its owner, system,
    /// orbit and template
    pub fn remove(&self, save: &mut StellarisSave, removal: FleetRemoval) -> Result<(), Error> {
        debug!("Removing fleet ID {}", self.id);
        let ships = self.ships(save)?;
        for ship in ships {
            ship.remove_detached(save)?;
        }

        let owners: Vec<_> = save
            .countries
            .values()
            .copied()
            .filter(|c| c.owned_fleet_ids(save).contains(&self.id))
            .collect();
        if owners.is_empty() {
            warn!("removing fleet {} that has no owner", self.id);
        }
        for country in owners {
            country.forget_owned_fleet(save, self.id);
        }

        let system = self
            .coords(save)
            .map(|x| x.origin(save.tree()))
            .and_then(|id| save.find_system_by_id(id));
        if let Some(system) = system {
            system.unregister_fleet(save, self.id);
        }

        self.unassign_orbit(save)?;

        if self.is_station(save) {
            if let Some(system) = system {
                system.set_starbase(save, None)?;
            }
        }

        if let Some(template) = self.template_id(save).and_then(|id| save.find_fleet_template_by_id(id)) {
            if removal.remove_template {
                template.remove(save)?;
            } else {
                template.set_fleet(save, None)?;
            }
        }
        self.set_template(save, None)?;

        erase(save, self.entry);
        save.fleets.remove(&self.id);
        Ok(())
    }

    /// Builds a fleet for a country with the ships a template asks for, at a
    /// position inside a system
    pub fn new_from_template(
        save: &mut StellarisSave,
        template: Id,
        country: Id,
        coords: &CoordsData,
        name: Option<&str>,
        game: &mut GameDataContext,
    ) -> Result<FleetHandle, Error> {
        let template = save.get_fleet_template_by_id(template)?;
        let country = save.get_country_by_id(country)?;
        let system = save.get_system_by_id(coords.origin)?;
        let composition = template.composition(save);
        for entry in &composition {
            let design = save.get_ship_design_by_id(entry.design)?;
            design.calculate_max_hitpoints(save, game)?;
        }

        let id = save.allocate_counter_id("last_created_fleet", |save, id| {
            save.find_fleet_by_id(id).is_some()
        })?;
        let name = name.map_or_else(|| format!("Fleet ID {}", id), String::from);
        debug!(
            "Adding new fleet ID {} named '{}' for country ID {}",
            id,
            name,
            country.id()
        );

        let tree = save.tree_mut();
        let object = ObjectHandle::new(tree.new_object());
        let name_object = object.push_object(tree, "name");
        name_object.push(tree, "key", Value::quoted(&name));
        object.push(tree, "fleet_template", template.id());
        object.push_object(tree, "ships");
        object.push_object(tree, "combat");
        object.push(tree, "owner", country.id());
        let movement = object.push_object(tree, "movement_manager");
        let position = coords.write(tree).value();
        movement.push(tree, "coordinate", position);
        object.push(tree, "friends_should_follow", Value::from(false));
        object.push(tree, "mobile", Value::from(true));
        object.push(tree, "hit_points", 0u32);

        let entry = save.push_entity(&["fleet"], id, object)?;
        let fleet = FleetHandle { id, entry };
        save.fleets.insert(id, fleet);

        push_id(save, country.entry(), &["sensor_range_fleets"], id)?;
        country.register_owned_fleet(save, id)?;

        for entry in composition {
            for _ in 0..entry.count {
                ShipHandle::new_from_design(save, entry.design, id, None, game)?;
            }
        }
        fleet.update_coords_to_ships_average(save)?;
        fleet.update_hitpoints(save)?;
        system.register_fleet(save, id)?;
        Ok(fleet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
date="2230.05.01"
last_created_fleet=8
last_created_ship=102
galactic_object={
	3={
		coordinate={ x=0 y=0 origin=4294967295 }
		name="Sol"
		starbase=102
		fleet_presence={ 7 8 }
	}
}
planets={
	planet={
		10={
			name="Earth"
			planet_orbitals={ 0=4294967295 1=7 }
		}
	}
}
ships={
	100={ fleet=7 coordinate={ x=10 y=0 origin=3 } hitpoints=200 }
	101={ fleet=7 coordinate={ x=20 y=10 origin=3 } hitpoints=150.5 }
	102={ fleet=8 coordinate={ x=0 y=0 origin=3 } hitpoints=5000
		movement_manager={ orbit={ orbitable={ planet=10 } index=1 } } }
}
fleet={
	7={
		name={ key="First Fleet" }
		fleet_template=16777216
		ships={ 100 101 }
		movement_manager={
			coordinate={ x=15 y=5 origin=3 }
			orbit={ orbitable={ starbase=102 } index=1 }
		}
	}
	8={
		name={ key="Starbase" }
		station=yes
		ships={ 102 }
		movement_manager={ coordinate={ x=0 y=0 origin=3 } }
	}
	9={
		name={ key="Pirates" }
		ships={ }
		movement_manager={ coordinate={ x=30 y=30 origin=3 } }
	}
}
fleet_template={
	16777216={
		fleet=7
		fleet_template_design={ { design=40 count=1 } }
	}
}
ship_design={
	40={ name={ key="Warden" } ship_size="corvette" }
}
country={
	0={
		graphical_culture="mammalian_01"
		fleets_manager={
			owned_fleets={
				{ fleet=7 ownership_status=normal }
				{ fleet=8 ownership_status=normal }
			}
		}
		fleet_template_manager={ fleet_template={ 16777216 } }
	}
	1={
		fleets_manager={ owned_fleets={ { fleet=9 } } }
	}
}
"#;

    fn save() -> StellarisSave {
        StellarisSave::from_strs("", GAMESTATE).unwrap()
    }

    #[test]
    fn read_fleet() {
        let save = save();
        let fleet = save.get_fleet_by_id(7).unwrap();
        assert_eq!(fleet.name(&save).as_deref(), Some("First Fleet"));
        assert!(!fleet.is_station(&save));
        assert!(save.get_fleet_by_id(8).unwrap().is_station(&save));
        assert_eq!(fleet.ship_ids(&save), vec![100, 101]);
        assert_eq!(fleet.find_owner(&save).unwrap().id(), 0);
        assert_eq!(fleet.template(&save).unwrap().map(|x| x.id()), Some(16777216));
    }

    #[test]
    fn fleet_without_owner() {
        let mut save = save();
        let country = save.get_country_by_id(1).unwrap();
        assert!(country.forget_owned_fleet(&mut save, 9));
        let err = save.get_fleet_by_id(9).unwrap().find_owner(&save).unwrap_err();
        assert_eq!(err.code(), "invalid-state/fleet/no-owner");
    }

    #[test]
    fn derived_position_and_health() {
        let mut save = save();
        let fleet = save.get_fleet_by_id(7).unwrap();
        fleet.update_coords_to_ships_average(&mut save).unwrap();
        fleet.update_hitpoints(&mut save).unwrap();
        assert_eq!(
            fleet.coords(&save).map(|x| x.data(save.tree())),
            Some(CoordsData::new(15.0, 5.0, 3))
        );
        let tree = save.tree();
        let hp = fleet.entry().find(tree, "hit_points").and_then(|x| x.value(tree).as_f64());
        assert_eq!(hp, Some(350.5));

        let empty = save.get_fleet_by_id(9).unwrap();
        empty.update_coords_to_ships_average(&mut save).unwrap();
        assert_eq!(
            empty.coords(&save).map(|x| x.data(save.tree())),
            Some(CoordsData::new(30.0, 30.0, 3))
        );
    }

    #[test]
    fn combat_is_symmetric_and_idempotent() {
        let mut save = save();
        let fleet = save.get_fleet_by_id(7).unwrap();
        fleet.combat(&mut save, 9).unwrap();
        fleet.combat(&mut save, 9).unwrap();
        save.get_fleet_by_id(9).unwrap().combat(&mut save, 7).unwrap();

        assert_eq!(fleet.combat_fleet_ids(&save), vec![9]);
        let pirates = save.get_fleet_by_id(9).unwrap();
        assert_eq!(pirates.combat_fleet_ids(&save), vec![7]);

        let start = field_id(&save, pirates.entry(), &["combat", "start_coordinate", "origin"]);
        assert_eq!(start, Some(3));
        assert_eq!(
            field_text(&save, pirates.entry(), &["combat", "start_date"]).as_deref(),
            Some("2230.05.01")
        );

        let err = fleet.combat(&mut save, 77).unwrap_err();
        assert_eq!(err.code(), "fleet-not-found");
    }

    #[test]
    fn attack_order() {
        let mut save = save();
        let fleet = save.get_fleet_by_id(7).unwrap();
        fleet.order_attack(&mut save, 9).unwrap();
        let entry = fleet.entry();
        assert_eq!(field_id(&save, entry, &["movement_manager", "target", "target", "type"]), Some(3));
        assert_eq!(field_id(&save, entry, &["movement_manager", "target", "target", "id"]), Some(9));
        assert_eq!(field_id(&save, entry, &["current_order", "follow_order", "fleet"]), Some(9));
        assert_eq!(field_id(&save, entry, &["order_id"]), Some(1));
    }

    #[test]
    fn move_ship_between_fleets() {
        let mut save = save();
        let pirates = save.get_fleet_by_id(9).unwrap();
        assert!(pirates.add_ship(&mut save, 101).unwrap());
        assert!(!pirates.add_ship(&mut save, 101).unwrap());
        assert_eq!(pirates.ship_ids(&save), vec![101]);
        assert_eq!(save.get_fleet_by_id(7).unwrap().ship_ids(&save), vec![100]);
        assert_eq!(save.get_ship_by_id(101).unwrap().fleet_id(&save), Some(9));
    }

    #[test]
    fn orbit_slot_is_freed() {
        let mut save = save();
        let fleet = save.get_fleet_by_id(7).unwrap();
        fleet.unassign_orbit(&mut save).unwrap();

        let planet = save.get_planet_by_id(10).unwrap();
        let tree = save.tree();
        let orbitals = planet.entry().find(tree, "planet_orbitals").unwrap();
        assert!(orbitals.find(tree, 0u32).map_or(false, |x| !x.is_absent(tree)));
        assert!(orbitals.find(tree, 1u32).map_or(false, |x| x.is_absent(tree)));
        let orbit = fleet
            .entry()
            .find_path(tree, &["movement_manager", "orbit"])
            .and_then(|x| x.object(tree))
            .unwrap();
        assert!(orbit.is_empty(tree));
    }

    #[test]
    fn remove_fleet() {
        let mut save = save();
        let fleet = save.get_fleet_by_id(7).unwrap();
        fleet.remove(&mut save, FleetRemoval::default()).unwrap();

        assert!(save.find_fleet_by_id(7).is_none());
        assert!(save.find_ship_by_id(100).is_none());
        assert!(save.find_ship_by_id(101).is_none());
        assert_eq!(save.get_country_by_id(0).unwrap().owned_fleet_ids(&save), vec![8]);
        assert_eq!(save.get_system_by_id(3).unwrap().fleet_presence_ids(&save), vec![8]);
        let template = save.get_fleet_template_by_id(16777216).unwrap();
        assert_eq!(template.fleet_id(&save), None);
    }

    #[test]
    fn remove_station_clears_starbase() {
        let mut save = save();
        let station = save.get_fleet_by_id(8).unwrap();
        station
            .remove(&mut save, FleetRemoval { remove_template: true })
            .unwrap();
        let system = save.get_system_by_id(3).unwrap();
        assert_eq!(system.starbase_id(&save), None);
        assert!(save.find_ship_by_id(102).is_none());
    }

    #[test]
    fn remove_with_template() {
        let mut save = save();
        let fleet = save.get_fleet_by_id(7).unwrap();
        fleet
            .remove(&mut save, FleetRemoval { remove_template: true })
            .unwrap();
        assert!(save.find_fleet_template_by_id(16777216).is_none());
        assert!(save
            .get_country_by_id(0)
            .unwrap()
            .fleet_template_ids(&save)
            .is_empty());
    }

    #[test]
    fn new_fleet_from_template() {
        let mut save = save();
        let mut game = GameDataContext::new(None);
        game.insert_source(crate::game_data::SHIP_SIZES, "corvette = { max_hitpoints = 300 }")
            .unwrap();
        game.insert_source(crate::game_data::COMPONENT_TEMPLATES, "").unwrap();

        let fleet = FleetHandle::new_from_template(
            &mut save,
            16777216,
            0,
            &CoordsData::new(5.0, 5.0, 3),
            Some("Second Fleet"),
            &mut game,
        )
        .unwrap();

        assert_eq!(fleet.id(), 9 + 1);
        assert_eq!(fleet.name(&save).as_deref(), Some("Second Fleet"));
        assert_eq!(fleet.ship_ids(&save), vec![103]);
        assert_eq!(fleet.find_owner(&save).unwrap().id(), 0);
        assert!(save
            .get_system_by_id(3)
            .unwrap()
            .fleet_presence_ids(&save)
            .contains(&fleet.id()));
        assert_eq!(
            fleet.coords(&save).map(|x| x.data(save.tree())),
            Some(CoordsData::new(5.0, 5.0, 3))
        );
        let tree = save.tree();
        let hp = fleet.entry().find(tree, "hit_points").and_then(|x| x.value(tree).as_f64());
        assert_eq!(hp, Some(300.0));
    }

    #[test]
    fn new_fleet_outside_systems_fails_cleanly() {
        let mut save = save();
        let before = save.to_strings();
        let err = FleetHandle::new_from_template(
            &mut save,
            16777216,
            0,
            &CoordsData::galactic(0.0, 0.0),
            None,
            &mut GameDataContext::new(None),
        )
        .unwrap_err();
        assert_eq!(err.code(), "system-not-found");
        assert_eq!(save.to_strings(), before);
    }
}
