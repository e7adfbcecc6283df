use super::{
    erase, field_f64, field_id, field_ids, field_text, set_field,
    set_field_quoted, ArmyHandle, CoordsHandle, CountryHandle, EntityHandle, Id,
};
use crate::{EntityKind, Error, StellarisSave};
use log::debug;

entity_handle!(
    /// An entry of `planets.planet`
    PlanetHandle,
    EntityKind::Planet
);

impl PlanetHandle {
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

    pub fn planet_class(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["planet_class"])
    }

    pub fn set_planet_class(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["planet_class"], value)
    }

    pub fn planet_size(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["planet_size"])
    }

    pub fn set_planet_size(&self, save: &mut StellarisSave, value: f64) -> Result<(), Error> {
        set_field(save, self.entry, &["planet_size"], value)
    }

    pub fn orbit(&self, save: &StellarisSave) -> Option<f64> {
        field_f64(save, self.entry, &["orbit"])
    }

    pub fn set_orbit(&self, save: &mut StellarisSave, value: f64) -> Result<(), Error> {
        set_field(save, self.entry, &["orbit"], value)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Related

    pub fn owner_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["owner"])
    }

    pub fn owner(&self, save: &StellarisSave) -> Result<Option<CountryHandle>, Error> {
        self.owner_id(save)
            .map(|id| save.get_country_by_id(id))
            .transpose()
    }

    pub fn set_owner(&self, save: &mut StellarisSave, country: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["owner"], country)
    }

    pub fn original_owner_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["original_owner"])
    }

    pub fn original_owner(&self, save: &StellarisSave) -> Result<Option<CountryHandle>, Error> {
        self.original_owner_id(save)
            .map(|id| save.get_country_by_id(id))
            .transpose()
    }

    pub fn set_original_owner(
        &self,
        save: &mut StellarisSave,
        country: Option<Id>,
    ) -> Result<(), Error> {
        set_field(save, self.entry, &["original_owner"], country)
    }

    pub fn controller_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["controller"])
    }

    pub fn controller(&self, save: &StellarisSave) -> Result<Option<CountryHandle>, Error> {
        self.controller_id(save)
            .map(|id| save.get_country_by_id(id))
            .transpose()
    }

    pub fn set_controller(&self, save: &mut StellarisSave, country: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["controller"], country)
    }

    pub fn surveyed_by_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["surveyed_by"])
    }

    pub fn set_surveyed_by(&self, save: &mut StellarisSave, country: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["surveyed_by"], country)
    }

    pub fn pop_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["pop"])
    }

    pub fn army_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["army"])
    }

    pub fn armies(&self, save: &StellarisSave) -> Result<Vec<ArmyHandle>, Error> {
        self.army_ids(save)
            .into_iter()
            .map(|id| save.get_army_by_id(id))
            .collect()
    }

    /// Strips the planet of its owner, pops and armies. The pops are erased
    /// from the gamestate along with the armies stationed here
    pub fn decolonize(&self, save: &mut StellarisSave) -> Result<(), Error> {
        debug!("Decolonizing planet ID {}", self.id);
        self.set_owner(save, None)?;
        set_field(save, self.entry, &["job_cache"], None::<Id>)?;

        let pops = self.pop_ids(save);
        if let Some(collection) = save.find_collection(&["pop"]) {
            let tree = save.tree();
            let doomed: Vec<_> = collection
                .entries(tree)
                .filter(|e| e.key(tree).as_id().map_or(false, |id| pops.contains(&id)))
                .collect();
            for entry in doomed {
                erase(save, entry);
            }
        }
        set_field(save, self.entry, &["pop"], None::<Id>)?;

        for army in self.army_ids(save) {
            if let Some(army) = save.find_army_by_id(army) {
                erase(save, army.entry());
                save.armies.remove(&army.id());
            }
        }
        set_field(save, self.entry, &["army"], None::<Id>)?;
        Ok(())
    }
}
