use super::StellarisSave;
use crate::handles::{
    ArmyHandle, CountryHandle, EntityHandle, FleetHandle, FleetRemoval, FleetTemplateHandle,
    LeaderHandle, LeaderRemoval, PlanetHandle, SectorHandle,
};
use crate::Error;
use log::{debug, warn};

/// What to remove along with a country
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryRemoval {
    /// Remove the fleets the country owns, with their ships
    pub fleets: bool,

    /// Remove the country's fleet templates
    pub fleet_templates: bool,
}

impl Default for CountryRemoval {
    fn default() -> Self {
        CountryRemoval {
            fleets: true,
            fleet_templates: true,
        }
    }
}

/// The entities a country removal affects, collected before the first
/// write
#[derive(Debug, Default)]
struct RemovalPlan {
    leaders: Vec<LeaderHandle>,
    fleets: Vec<FleetHandle>,
    templates: Vec<FleetTemplateHandle>,
    armies: Vec<ArmyHandle>,
    colonies: Vec<PlanetHandle>,
    controlled: Vec<PlanetHandle>,
    sectors: Vec<SectorHandle>,
}

impl RemovalPlan {
    fn build(save: &StellarisSave, country: CountryHandle) -> Result<RemovalPlan, Error> {
        let id = country.id();
        let mut plan = RemovalPlan {
            leaders: save.leaders().filter(|x| x.country_id(save) == Some(id)).collect(),
            armies: save.armies().filter(|x| x.owner_id(save) == Some(id)).collect(),
            colonies: save.planets().filter(|x| x.owner_id(save) == Some(id)).collect(),
            controlled: save.planets().filter(|x| x.controller_id(save) == Some(id)).collect(),
            sectors: save.sectors().filter(|x| x.owner_id(save) == Some(id)).collect(),
            ..RemovalPlan::default()
        };

        for fleet in country.owned_fleet_ids(save) {
            match save.find_fleet_by_id(fleet) {
                Some(fleet) => {
                    // ships are resolved while removing, so a dangling one
                    // has to fail here
                    fleet.ships(save)?;
                    plan.fleets.push(fleet);
                }
                None => warn!("country {} owns missing fleet {}", id, fleet),
            }
        }

        for template in country.fleet_template_ids(save) {
            match save.find_fleet_template_by_id(template) {
                Some(template) => plan.templates.push(template),
                None => warn!("country {} lists missing fleet template {}", id, template),
            }
        }

        Ok(plan)
    }
}

/// Removes a country and what depends on it: its leaders, fleets and
/// ships, fleet templates, armies, colonies and sectors. Planets it merely
/// controls lose their controller. Ship designs are kept since other
/// countries may use them
pub(crate) fn remove_country(
    save: &mut StellarisSave,
    country: CountryHandle,
    removal: CountryRemoval,
) -> Result<(), Error> {
    let plan = RemovalPlan::build(save, country)?;
    debug!(
        "Removing country '{}' ID {}",
        country.name(save).unwrap_or_default(),
        country.id()
    );

    // Leaders go first and without unassigning: whatever they lead goes too
    for leader in plan.leaders {
        leader.remove(
            save,
            LeaderRemoval {
                remove_country_relation: false,
            },
        )?;
    }

    if removal.fleets {
        for fleet in plan.fleets {
            fleet.remove(save, FleetRemoval::default())?;
        }
    }

    if removal.fleet_templates {
        for template in plan.templates {
            template.remove(save)?;
        }
    } else if removal.fleets {
        for template in plan.templates {
            template.set_fleet(save, None)?;
        }
    }

    for army in plan.armies {
        army.remove(save);
    }

    for planet in plan.colonies {
        planet.decolonize(save)?;
    }
    for planet in plan.controlled {
        planet.set_controller(save, None)?;
    }

    for sector in plan.sectors {
        sector.remove(save)?;
    }

    crate::handles::erase(save, country.entry());
    save.countries.remove(&country.id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::Id;

    const GAMESTATE: &str = r#"
galactic_object={
	3={ name="Sol" sector=2 fleet_presence={ 50 } }
}
planets={
	planet={
		10={ name="Earth" owner=0 controller=0 army={ 70 } pop={ 80 } }
		11={ name="Mars" owner=1 controller=0 }
	}
}
pop={
	80={ species=0 }
}
army={
	70={ owner=0 planet=10 }
	71={ owner=1 }
}
leaders={
	20={ country=0 }
	21={ country=1 }
}
ships={
	100={ fleet=50 }
}
fleet={
	50={
		name={ key="Home Guard" }
		fleet_template=16777216
		ships={ 100 }
		movement_manager={ coordinate={ x=0 y=0 origin=3 } }
	}
}
fleet_template={
	16777216={ fleet=50 fleet_template_design={ { design=40 count=1 } } }
}
sectors={
	2={ name="Core" owner=0 systems={ 3 } }
}
country={
	0={
		name={ key="Terra" }
		owned_leaders={ 20 }
		sectors={ owned={ 2 } }
		fleets_manager={ owned_fleets={ { fleet=50 } } }
		fleet_template_manager={ fleet_template={ 16777216 } }
	}
	1={
		name={ key="Other" }
		owned_leaders={ 21 }
	}
}
"#;

    fn save() -> StellarisSave {
        StellarisSave::from_strs("", GAMESTATE).unwrap()
    }

    #[test]
    fn cascade() {
        let mut save = save();
        let terra = save.get_country_by_id(0).unwrap();
        terra.remove(&mut save, CountryRemoval::default()).unwrap();

        assert!(save.find_country_by_id(0).is_none());
        assert!(save.find_leader_by_id(20).is_none());
        assert!(save.find_leader_by_id(21).is_some());
        assert!(save.find_fleet_by_id(50).is_none());
        assert!(save.find_ship_by_id(100).is_none());
        assert!(save.find_fleet_template_by_id(16777216).is_none());
        assert!(save.find_army_by_id(70).is_none());
        assert!(save.find_army_by_id(71).is_some());
        assert!(save.find_sector_by_id(2).is_none());

        let earth = save.get_planet_by_id(10).unwrap();
        assert_eq!(earth.owner_id(&save), None);
        assert_eq!(earth.controller_id(&save), None);
        let mars = save.get_planet_by_id(11).unwrap();
        assert_eq!(mars.owner_id(&save), Some(1));
        assert_eq!(mars.controller_id(&save), None);

        let sol = save.get_system_by_id(3).unwrap();
        assert_eq!(sol.sector_id(&save), None);
        assert_eq!(sol.fleet_presence_ids(&save), Vec::<Id>::new());

        let gamestate = save.to_strings().1;
        assert!(!gamestate.contains("Terra"));
        assert!(!gamestate.contains("80={"));
    }

    #[test]
    fn keep_templates() {
        let mut save = save();
        let terra = save.get_country_by_id(0).unwrap();
        let removal = CountryRemoval {
            fleets: true,
            fleet_templates: false,
        };
        terra.remove(&mut save, removal).unwrap();

        let template = save.get_fleet_template_by_id(16777216).unwrap();
        assert_eq!(template.fleet_id(&save), None);
    }

    #[test]
    fn keep_fleets() {
        let mut save = save();
        let terra = save.get_country_by_id(0).unwrap();
        let removal = CountryRemoval {
            fleets: false,
            fleet_templates: false,
        };
        terra.remove(&mut save, removal).unwrap();

        let fleet = save.get_fleet_by_id(50).unwrap();
        assert_eq!(fleet.ship_ids(&save), vec![100]);
        let template = save.get_fleet_template_by_id(16777216).unwrap();
        assert_eq!(template.fleet_id(&save), Some(50));
    }

    #[test]
    fn dangling_ship_fails_before_any_change() {
        let mut save = StellarisSave::from_strs("", &GAMESTATE.replace("ships={ 100 }", "ships={ 100 101 }")).unwrap();
        let before = save.to_strings();
        let terra = save.get_country_by_id(0).unwrap();
        let err = terra.remove(&mut save, CountryRemoval::default()).unwrap_err();
        assert_eq!(err.code(), "ship-not-found");
        assert_eq!(save.to_strings(), before);
    }
}
