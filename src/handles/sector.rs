use super::{
    erase, field_id, field_ids, field_text, push_id, remove_id, set_field,
    set_field_quoted, CountryHandle, EntityHandle, Id, LeaderHandle, LeaderLocation, SystemHandle,
};
use crate::{EntityKind, Error, ErrorKind, StellarisSave};
use log::debug;

entity_handle!(
    /// An entry of `sectors`
    SectorHandle,
    EntityKind::Sector
);

impl SectorHandle {
    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name"])
    }

    pub fn set_name(&self, save: &mut StellarisSave, name: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["name"], name)
    }

    pub fn sector_type(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["type"])
    }

    pub fn set_sector_type(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["type"], value)
    }

    pub fn system_ids(&self, save: &StellarisSave) -> Vec<Id> {
        field_ids(save, self.entry, &["systems"])
    }

    pub fn systems(&self, save: &StellarisSave) -> Result<Vec<SystemHandle>, Error> {
        self.system_ids(save)
            .into_iter()
            .map(|id| save.get_system_by_id(id))
            .collect()
    }

    pub fn has_system(&self, save: &StellarisSave, system: Id) -> bool {
        self.system_ids(save).contains(&system)
    }

    /// Lists the system in the sector. The system's own `sector` reference
    /// is left to the caller
    pub fn add_system(&self, save: &mut StellarisSave, system: Id) -> Result<bool, Error> {
        push_id(save, self.entry, &["systems"], system)
    }

    pub fn remove_system(&self, save: &mut StellarisSave, system: Id) -> bool {
        remove_id(save, self.entry, &["systems"], system)
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

    pub fn governor_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["governor"])
    }

    pub fn governor(&self, save: &StellarisSave) -> Result<Option<LeaderHandle>, Error> {
        self.governor_id(save)
            .map(|id| save.get_leader_by_id(id))
            .transpose()
    }

    /// Appoints a governor, who must belong to the sector's owner and is
    /// pulled from any previous assignment. `None` leaves the sector without
    /// a governor
    pub fn set_governor(&self, save: &mut StellarisSave, leader: Option<Id>) -> Result<(), Error> {
        let leader = match leader {
            Some(x) => x,
            None => return set_field(save, self.entry, &["governor"], None::<Id>),
        };

        let handle = save.get_leader_by_id(leader)?;
        let owned = match self.owner(save)? {
            Some(owner) => owner.owned_leader_ids(save).contains(&leader),
            None => false,
        };

        if !owned {
            return Err(Error::new(ErrorKind::NotOwnedGovernor {
                sector: self.id,
                leader,
            }));
        }

        handle.unassign(save)?;
        handle.set_location(save, LeaderLocation::Sector(self.id), None)?;
        set_field(save, self.entry, &["governor"], leader)
    }

    /// Erases the sector. Its systems fall out of any sector and the
    /// governor is unassigned
    pub fn remove(&self, save: &mut StellarisSave) -> Result<(), Error> {
        debug!("Removing sector ID {}", self.id);
        for system in self.system_ids(save) {
            if let Some(system) = save.find_system_by_id(system) {
                system.set_sector(save, None)?;
            }
        }

        if let Some(governor) = self.governor_id(save).and_then(|id| save.find_leader_by_id(id)) {
            governor.unassign(save)?;
        }

        if let Some(owner) = self.owner_id(save).and_then(|id| save.find_country_by_id(id)) {
            remove_id(save, owner.entry(), &["sectors", "owned"], self.id);
        }

        erase(save, self.entry);
        save.sectors.remove(&self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
galactic_object={
	0={ name="Sol" sector=2 }
	1={ name="Alpha" sector=2 }
}
planets={
	planet={
		10={ name="Earth" }
	}
}
leaders={
	20={ country=0 location={ type=planet id=10 area=none assignment=none } }
	21={ country=1 location={ type=planet id=10 area=none assignment=none } }
}
country={
	0={
		name="Terra"
		capital=10
		owned_leaders={ 20 }
		sectors={ owned={ 2 } }
	}
	1={
		name="Other"
		owned_leaders={ 21 }
	}
}
sectors={
	2={
		name="Core"
		owner=0
		systems={ 0 1 }
	}
}
"#;

    #[test]
    fn governor_must_be_owned() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let core = save.get_sector_by_id(2).unwrap();
        let err = core.set_governor(&mut save, Some(21)).unwrap_err();
        assert_eq!(err.code(), "sector/assign-not-owned-governor");
        assert_eq!(core.governor_id(&save), None);

        core.set_governor(&mut save, Some(20)).unwrap();
        assert_eq!(core.governor(&save).unwrap().unwrap().id(), 20);
    }

    #[test]
    fn systems() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let core = save.get_sector_by_id(2).unwrap();
        assert!(core.has_system(&save, 1));
        assert!(core.remove_system(&mut save, 1));
        assert!(!core.add_system(&mut save, 0).unwrap());
        assert_eq!(core.system_ids(&save), vec![0]);
    }

    #[test]
    fn remove_clears_references() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let core = save.get_sector_by_id(2).unwrap();
        core.set_governor(&mut save, Some(20)).unwrap();
        core.remove(&mut save).unwrap();

        assert!(save.find_sector_by_id(2).is_none());
        assert_eq!(save.get_system_by_id(0).unwrap().sector_id(&save), None);
        let terra = save.get_country_by_id(0).unwrap();
        assert!(terra.owned_sector_ids(&save).is_empty());
        assert!(!save.to_strings().1.contains("Core"));
    }
}
