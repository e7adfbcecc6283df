use super::{
    erase, field_f64, field_id, field_text, remove_id, set_field,
    set_field_quoted, CountryHandle, EntityHandle, Id, PlanetHandle, ShipHandle, SpeciesHandle,
};
use crate::{EntityKind, Error, StellarisSave};

entity_handle!(
    /// An entry of `army`
    ArmyHandle,
    EntityKind::Army
);

impl ArmyHandle {
    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name"])
    }

    pub fn set_name(&self, save: &mut StellarisSave, name: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["name"], name)
    }

    pub fn army_type(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["type"])
    }

    pub fn set_army_type(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["type"], value)
    }

    pub fn health(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["health"])
    }

    pub fn set_health(&self, save: &mut StellarisSave, value: f64) -> Result<(), Error> {
        set_field(save, self.entry, &["health"], value)
    }

    pub fn max_health(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["max_health"])
    }

    pub fn set_max_health(&self, save: &mut StellarisSave, value: f64) -> Result<(), Error> {
        set_field(save, self.entry, &["max_health"], value)
    }

    pub fn morale(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["morale"])
    }

    pub fn set_morale(&self, save: &mut StellarisSave, value: f64) -> Result<(), Error> {
        set_field(save, self.entry, &["morale"], value)
    }

    pub fn owner_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["owner"])
    }

    pub fn owner(&self, save: &StellarisSave) -> Result<Option<CountryHandle>, Error> {
        self.owner_id(save)
            .map(|id| save.get_country_by_id(id))
            .transpose()
    }

    pub fn set_owner(&self, save: &mut StellarisSave, country: Id) -> Result<(), Error> {
        set_field(save, self.entry, &["owner"], country)
    }

    /// Index into the species database
    pub fn species_index(&self, save: &StellarisSave) -> Option<usize> {
        field_id(save, self.entry, &["species"]).map(|x| x as usize)
    }

    pub fn species(&self, save: &StellarisSave) -> Result<Option<SpeciesHandle>, Error> {
        self.species_index(save)
            .map(|index| save.get_species_by_index(index))
            .transpose()
    }

    pub fn set_species(&self, save: &mut StellarisSave, index: usize) -> Result<(), Error> {
        set_field(save, self.entry, &["species"], index)
    }

    pub fn home_planet_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["home_planet"])
    }

    pub fn home_planet(&self, save: &StellarisSave) -> Result<Option<PlanetHandle>, Error> {
        self.home_planet_id(save)
            .map(|id| save.get_planet_by_id(id))
            .transpose()
    }

    pub fn set_home_planet(&self, save: &mut StellarisSave, planet: Id) -> Result<(), Error> {
        set_field(save, self.entry, &["home_planet"], planet)
    }

    /// The planet the army is stationed on
    pub fn planet_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["planet"])
    }

    pub fn planet(&self, save: &StellarisSave) -> Result<Option<PlanetHandle>, Error> {
        self.planet_id(save)
            .map(|id| save.get_planet_by_id(id))
            .transpose()
    }

    pub fn set_planet(&self, save: &mut StellarisSave, planet: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["planet"], planet)
    }

    /// The transport ship carrying the army
    pub fn ship_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["ship"])
    }

    pub fn ship(&self, save: &StellarisSave) -> Result<Option<ShipHandle>, Error> {
        self.ship_id(save)
            .map(|id| save.get_ship_by_id(id))
            .transpose()
    }

    pub fn set_ship(&self, save: &mut StellarisSave, ship: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["ship"], ship)
    }

    /// Erases the army and drops it from the planet it is stationed on
    pub fn remove(&self, save: &mut StellarisSave) {
        if let Some(planet) = self.planet_id(save).and_then(|id| save.find_planet_by_id(id)) {
            remove_id(save, planet.entry(), &["army"], self.id);
        }

        erase(save, self.entry);
        save.armies.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
planets={
	planet={
		5={ name="Earth" army={ 7 8 } }
	}
}
species_db={
	0={ name="Humans" }
}
army={
	7={
		name="Defense Army"
		type="defense_army"
		health=200
		max_health=200
		morale=150.5
		owner=0
		species=0
		home_planet=5
		planet=5
	}
	8={ name="Assault" planet=5 }
}
"#;

    #[test]
    fn fields() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let army = save.get_army_by_id(7).unwrap();
        assert_eq!(army.army_type(&save).as_deref(), Some("defense_army"));
        assert_eq!(army.morale(&save), Some(150.5));
        assert_eq!(army.species(&save).unwrap().unwrap().index(), 0);
        assert_eq!(army.home_planet(&save).unwrap().unwrap().id(), 5);
        assert_eq!(army.ship_id(&save), None);

        army.set_health(&mut save, 120.0).unwrap();
        assert_eq!(army.health(&save), Some(120.0));
    }

    #[test]
    fn remove_unstations() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let army = save.get_army_by_id(7).unwrap();
        army.remove(&mut save);
        assert!(save.find_army_by_id(7).is_none());
        let earth = save.get_planet_by_id(5).unwrap();
        assert_eq!(earth.army_ids(&save), vec![8]);
    }
}
