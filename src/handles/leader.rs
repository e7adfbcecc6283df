use super::{
    erase, field_f64, field_id, field_text, set_field, set_field_quoted,
    CountryHandle, Id,
};
use crate::text::Value;
use crate::{EntityKind, Error, StellarisSave};
use log::debug;

/// A research field with its own head scientist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScienceArea {
    Physics,
    Society,
    Engineering,
}

impl ScienceArea {
    pub const ALL: [ScienceArea; 3] = [
        ScienceArea::Physics,
        ScienceArea::Society,
        ScienceArea::Engineering,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScienceArea::Physics => "physics",
            ScienceArea::Society => "society",
            ScienceArea::Engineering => "engineering",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ScienceArea::ALL.iter().copied().find(|x| x.name() == name)
    }
}

/// Where a leader is, from `location={ type id area }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderLocation {
    Planet(Id),
    Sector(Id),
    /// Heading research for a country
    Tech { country: Id, area: ScienceArea },
    Ship(Id),
}

impl LeaderLocation {
    fn type_name(&self) -> &'static str {
        match self {
            LeaderLocation::Planet(_) => "planet",
            LeaderLocation::Sector(_) => "sector",
            LeaderLocation::Tech { .. } => "tech",
            LeaderLocation::Ship(_) => "ship",
        }
    }

    fn id(&self) -> Id {
        match *self {
            LeaderLocation::Planet(id) | LeaderLocation::Sector(id) | LeaderLocation::Ship(id) => id,
            LeaderLocation::Tech { country, .. } => country,
        }
    }
}

/// How much of a leader's surroundings to update on removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderRemoval {
    /// Unassign the leader and drop it from the country's leader pool
    pub remove_country_relation: bool,
}

impl Default for LeaderRemoval {
    fn default() -> Self {
        LeaderRemoval {
            remove_country_relation: true,
        }
    }
}

entity_handle!(
    /// An entry of `leaders`
    LeaderHandle,
    EntityKind::Leader
);

impl LeaderHandle {
    pub fn first_name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name", "first_name"])
    }

    pub fn set_first_name(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["name", "first_name"], value)
    }

    pub fn second_name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name", "second_name"])
    }

    pub fn set_second_name(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["name", "second_name"], value)
    }

    pub fn gender(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["gender"])
    }

    pub fn set_gender(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field(save, self.entry, &["gender"], Value::word(value))
    }

    pub fn age(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["age"])
    }

    pub fn set_age(&self, save: &mut StellarisSave, value: u32) -> Result<(), Error> {
        set_field(save, self.entry, &["age"], value)
    }

    pub fn level(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["level"])
    }

    pub fn set_level(&self, save: &mut StellarisSave, value: u32) -> Result<(), Error> {
        set_field(save, self.entry, &["level"], value)
    }

    pub fn country_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["country"])
    }

    pub fn country(&self, save: &StellarisSave) -> Result<Option<CountryHandle>, Error> {
        self.country_id(save)
            .map(|id| save.get_country_by_id(id))
            .transpose()
    }

    pub fn set_country(&self, save: &mut StellarisSave, country: Id) -> Result<(), Error> {
        set_field(save, self.entry, &["country"], country)
    }

    /// `None` when the location is missing or of an unknown type
    pub fn location(&self, save: &StellarisSave) -> Option<LeaderLocation> {
        let kind = field_text(save, self.entry, &["location", "type"])?;
        let id = field_id(save, self.entry, &["location", "id"])?;
        match kind.as_str() {
            "planet" => Some(LeaderLocation::Planet(id)),
            "sector" => Some(LeaderLocation::Sector(id)),
            "ship" => Some(LeaderLocation::Ship(id)),
            "tech" => {
                let area = field_text(save, self.entry, &["location", "area"])?;
                ScienceArea::from_name(&area).map(|area| LeaderLocation::Tech { country: id, area })
            }
            _ => None,
        }
    }

    /// Moves the leader. Moving onto a ship also makes the leader the ship's
    /// commander. The assignment defaults to `none`
    pub fn set_location(
        &self,
        save: &mut StellarisSave,
        location: LeaderLocation,
        assignment: Option<&str>,
    ) -> Result<(), Error> {
        if let LeaderLocation::Ship(ship) = location {
            save.get_ship_by_id(ship)?.set_leader(save, Some(self.id))?;
        }

        let area = match location {
            LeaderLocation::Tech { area, .. } => area.name(),
            _ => "none",
        };

        let entry = self.entry;
        set_field(save, entry, &["location", "type"], Value::word(location.type_name()))?;
        set_field(save, entry, &["location", "id"], location.id())?;
        set_field(save, entry, &["location", "area"], Value::word(area))?;
        let assignment = Value::word(assignment.unwrap_or("none"));
        set_field(save, entry, &["location", "assignment"], assignment)
    }

    /// Pulls the leader from any role (ruler, head scientist, governor or
    /// ship commander) and parks it on the country's capital. The leader
    /// stays in the country's pool
    pub fn unassign(&self, save: &mut StellarisSave) -> Result<(), Error> {
        let country = self.country_id(save).and_then(|id| save.find_country_by_id(id));
        if let Some(country) = country {
            country.clear_leader_roles(save, self.id)?;
        }

        match self.location(save) {
            Some(LeaderLocation::Ship(id)) => {
                if let Some(ship) = save.find_ship_by_id(id) {
                    if ship.leader_id(save) == Some(self.id) {
                        ship.set_leader(save, None)?;
                    }
                }
            }
            Some(LeaderLocation::Sector(id)) => {
                if let Some(sector) = save.find_sector_by_id(id) {
                    if sector.governor_id(save) == Some(self.id) {
                        sector.set_governor(save, None)?;
                    }
                }
            }
            _ => {}
        }

        if let Some(capital) = country.and_then(|x| x.capital_id(save)) {
            self.set_location(save, LeaderLocation::Planet(capital), None)?;
        }
        Ok(())
    }

    /// Erases the leader
    pub fn remove(&self, save: &mut StellarisSave, removal: LeaderRemoval) -> Result<(), Error> {
        debug!("Removing leader ID {}", self.id);
        if removal.remove_country_relation {
            self.unassign(save)?;
            if let Some(country) = self.country_id(save).and_then(|id| save.find_country_by_id(id)) {
                country.remove_leader(save, self.id)?;
            }
        }

        erase(save, self.entry);
        save.leaders.remove(&self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
planets={
	planet={
		10={ name="Earth" }
	}
}
ships={
	30={ name={ key="Explorer" } leader=21 }
}
leaders={
	20={
		name={ first_name="Ada" second_name="Lovelace" }
		gender=female
		age=40
		level=3
		country=0
		location={ type=tech id=0 area=physics assignment=research }
	}
	21={
		country=0
		location={ type=ship id=30 area=none assignment=none }
	}
}
country={
	0={
		name="Terra"
		capital=10
		ruler=20
		owned_leaders={ 20 21 }
		tech_status={ leaders={ physics=20 society=4294967295 engineering=4294967295 } }
	}
}
"#;

    #[test]
    fn fields() {
        let save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ada = save.get_leader_by_id(20).unwrap();
        assert_eq!(ada.first_name(&save).as_deref(), Some("Ada"));
        assert_eq!(ada.second_name(&save).as_deref(), Some("Lovelace"));
        assert_eq!(ada.gender(&save).as_deref(), Some("female"));
        assert_eq!(ada.level(&save), Some(3.0));
        assert_eq!(
            ada.location(&save),
            Some(LeaderLocation::Tech {
                country: 0,
                area: ScienceArea::Physics
            })
        );
    }

    #[test]
    fn unassign_clears_roles() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ada = save.get_leader_by_id(20).unwrap();
        ada.unassign(&mut save).unwrap();

        let terra = save.get_country_by_id(0).unwrap();
        assert_eq!(terra.ruler_id(&save), None);
        assert_eq!(terra.scientist_leader_id(&save, ScienceArea::Physics), None);
        assert_eq!(ada.location(&save), Some(LeaderLocation::Planet(10)));
        assert_eq!(terra.owned_leader_ids(&save), vec![20, 21]);
    }

    #[test]
    fn unassign_from_ship() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let captain = save.get_leader_by_id(21).unwrap();
        captain.unassign(&mut save).unwrap();
        assert_eq!(save.get_ship_by_id(30).unwrap().leader_id(&save), None);
    }

    #[test]
    fn remove_drops_from_pool() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ada = save.get_leader_by_id(20).unwrap();
        ada.remove(&mut save, LeaderRemoval::default()).unwrap();
        assert!(save.find_leader_by_id(20).is_none());
        let terra = save.get_country_by_id(0).unwrap();
        assert_eq!(terra.owned_leader_ids(&save), vec![21]);
        assert!(!save.to_strings().1.contains("Lovelace"));
    }

    #[test]
    fn move_onto_ship() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let ada = save.get_leader_by_id(20).unwrap();
        ada.set_location(&mut save, LeaderLocation::Ship(30), Some("survey"))
            .unwrap();
        assert_eq!(save.get_ship_by_id(30).unwrap().leader_id(&save), Some(20));
        assert_eq!(ada.location(&save), Some(LeaderLocation::Ship(30)));
    }
}
