use super::{
    erase, field_id, set_field, CoordsData, CountryHandle, EntityHandle, FleetHandle,
    Id, ShipDesignHandle, UNDEFINED_ID,
};
use crate::game_data::GameDataContext;
use crate::text::{EntryHandle, ObjectHandle};
use crate::{EntityKind, Error, StellarisSave};
use log::debug;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// First id handed out when a save has no fleet templates yet
const FIRST_TEMPLATE_ID: Id = 16777216;

/// A `{ design count }` record of a template's composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompositionEntry {
    pub design: Id,
    pub count: u32,
}

impl CompositionEntry {
    pub fn new(design: Id, count: u32) -> Self {
        CompositionEntry { design, count }
    }
}

/// Where and how to spawn the fleet of a new template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetSpawn<'a> {
    pub coords: CoordsData,
    pub name: Option<&'a str>,
}

entity_handle!(
    /// An entry of `fleet_template`
    FleetTemplateHandle,
    EntityKind::FleetTemplate
);

impl FleetTemplateHandle {
    pub fn fleet_id(&self, save: &StellarisSave) -> Option<Id> {
        field_id(save, self.entry, &["fleet"])
    }

    pub fn fleet(&self, save: &StellarisSave) -> Result<Option<FleetHandle>, Error> {
        self.fleet_id(save)
            .map(|id| save.get_fleet_by_id(id))
            .transpose()
    }

    pub fn set_fleet(&self, save: &mut StellarisSave, fleet: Option<Id>) -> Result<(), Error> {
        set_field(save, self.entry, &["fleet"], fleet)
    }

    fn design_records(&self, save: &StellarisSave) -> Vec<EntryHandle> {
        let tree = save.tree();
        self.entry
            .find(tree, "fleet_template_design")
            .and_then(|x| x.object(tree))
            .map(|list| list.live_entries(tree).collect())
            .unwrap_or_default()
    }

    fn record_for(&self, save: &StellarisSave, design: Id) -> Option<EntryHandle> {
        let tree = save.tree();
        self.design_records(save).into_iter().find(|x| {
            x.find(tree, "design").and_then(|d| d.value(tree).as_id()) == Some(design)
        })
    }

    fn record_count(save: &StellarisSave, record: EntryHandle) -> i64 {
        let tree = save.tree();
        record
            .find(tree, "count")
            .and_then(|x| x.value(tree).as_i64())
            .unwrap_or(1)
    }

    /// Designs and how many ships of each. A record without a count means one
    pub fn composition(&self, save: &StellarisSave) -> Vec<CompositionEntry> {
        let tree = save.tree();
        self.design_records(save)
            .into_iter()
            .filter_map(|record| {
                let design = record.find(tree, "design")?.value(tree).as_id()?;
                let count = Self::record_count(save, record).max(0) as u32;
                Some(CompositionEntry { design, count })
            })
            .collect()
    }

    pub fn design_ids(&self, save: &StellarisSave) -> Vec<Id> {
        self.composition(save).into_iter().map(|x| x.design).collect()
    }

    pub fn designs(&self, save: &StellarisSave) -> Result<Vec<ShipDesignHandle>, Error> {
        self.design_ids(save)
            .into_iter()
            .map(|id| save.get_ship_design_by_id(id))
            .collect()
    }

    /// eg: `3x Warden (corvette #40), 1x Lancer (destroyer #41)`
    pub fn composition_description(&self, save: &StellarisSave) -> Result<String, Error> {
        let mut parts = Vec::new();
        for entry in self.composition(save) {
            let design = save.get_ship_design_by_id(entry.design)?;
            parts.push(format!(
                "{}x {} ({} #{})",
                entry.count,
                design.name(save).unwrap_or_default(),
                design.ship_size(save).unwrap_or_default(),
                design.id()
            ));
        }
        Ok(parts.join(", "))
    }

    /// Adds ships of a design, merging with an existing record
    pub fn add_design(&self, save: &mut StellarisSave, design: Id, count: u32) -> Result<(), Error> {
        match self.record_for(save, design) {
            Some(record) => {
                let total = Self::record_count(save, record) + i64::from(count);
                let tree = save.tree_mut();
                record.get(tree, "count")?.set_value(tree, total);
            }
            None => {
                let tree = save.tree_mut();
                let list = self
                    .entry
                    .get(tree, "fleet_template_design")?
                    .value_as_object(tree)?;
                let record = list.push_element_object(tree);
                record.push(tree, "design", design);
                record.push(tree, "count", count);
            }
        }
        Ok(())
    }

    /// Takes ships of a design away. `None` or a count that leaves nothing
    /// removes the record altogether
    pub fn remove_design(&self, save: &mut StellarisSave, design: Id, count: Option<u32>) -> Result<(), Error> {
        let record = match self.record_for(save, design) {
            Some(x) => x,
            None => return Ok(()),
        };

        let left = count.map(|count| Self::record_count(save, record) - i64::from(count));
        let tree = save.tree_mut();
        match left {
            Some(left) if left > 0 => record.get(tree, "count")?.set_value(tree, left),
            _ => {
                if let Some(list) = self
                    .entry
                    .find(tree, "fleet_template_design")
                    .and_then(|x| x.object(tree))
                {
                    list.remove_entry(tree, record);
                }
            }
        }
        Ok(())
    }

    /// Refreshes the total ship `count`
    pub fn update_count(&self, save: &mut StellarisSave) -> Result<(), Error> {
        let total: u32 = self.composition(save).iter().map(|x| x.count).sum();
        set_field(save, self.entry, &["count"], total)
    }

    fn allocate_id(save: &StellarisSave) -> Result<Id, Error> {
        let mut id = save
            .fleet_templates
            .keys()
            .next_back()
            .copied()
            .filter(|&x| x != 0)
            .unwrap_or(FIRST_TEMPLATE_ID);
        while save.find_fleet_template_by_id(id).is_some() {
            id = id.checked_add(1).filter(|&x| x != UNDEFINED_ID).ok_or_else(|| {
                Error::invalid_state(
                    "invalid-state/id-exhausted",
                    "no fleet template id left",
                )
            })?;
        }
        Ok(id)
    }

    /// Fleets spawn into a system, which has to exist
    fn check_spawn(save: &StellarisSave, spawn: &Option<FleetSpawn<'_>>) -> Result<(), Error> {
        if let Some(spawn) = spawn {
            save.get_system_by_id(spawn.coords.origin)?;
        }
        Ok(())
    }

    fn register(
        save: &mut StellarisSave,
        id: Id,
        object: ObjectHandle,
        country: CountryHandle,
        spawn: Option<FleetSpawn<'_>>,
        game: &mut GameDataContext,
    ) -> Result<FleetTemplateHandle, Error> {
        let entry = save.push_entity(&["fleet_template"], id, object)?;
        let template = FleetTemplateHandle { id, entry };
        save.fleet_templates.insert(id, template);
        country.register_fleet_template(save, id)?;

        match spawn {
            Some(spawn) => {
                let fleet = FleetHandle::new_from_template(
                    save,
                    id,
                    country.id(),
                    &spawn.coords,
                    spawn.name,
                    game,
                )?;
                template.set_fleet(save, Some(fleet.id()))?;
            }
            None => template.set_fleet(save, None)?,
        }
        Ok(template)
    }

    /// Creates a template for a country and, with a spawn, the fleet that
    /// fills it
    pub fn new(
        save: &mut StellarisSave,
        country: Id,
        composition: &[CompositionEntry],
        spawn: Option<FleetSpawn<'_>>,
        game: &mut GameDataContext,
    ) -> Result<FleetTemplateHandle, Error> {
        let country = save.get_country_by_id(country)?;
        for entry in composition {
            save.get_ship_design_by_id(entry.design)?;
        }
        Self::check_spawn(save, &spawn)?;

        let id = Self::allocate_id(save)?;
        debug!("Adding new fleet template ID {} for country ID {}", id, country.id());

        let tree = save.tree_mut();
        let object = ObjectHandle::new(tree.new_object());
        object.push_object(tree, "fleet_template_design");
        object.push_object(tree, "all_queued");

        let template = Self::register(save, id, object, country, None, game)?;
        for entry in composition {
            template.add_design(save, entry.design, entry.count)?;
        }
        template.update_count(save)?;

        if let Some(spawn) = spawn {
            let fleet = FleetHandle::new_from_template(
                save,
                id,
                country.id(),
                &spawn.coords,
                spawn.name,
                game,
            )?;
            template.set_fleet(save, Some(fleet.id()))?;
        }
        Ok(template)
    }

    /// Duplicates the template within its save for a country, optionally
    /// with a freshly built fleet
    pub fn copy(
        &self,
        save: &mut StellarisSave,
        country: Id,
        spawn: Option<FleetSpawn<'_>>,
        game: &mut GameDataContext,
    ) -> Result<FleetTemplateHandle, Error> {
        let country = save.get_country_by_id(country)?;
        let source = self
            .object(save)
            .ok_or_else(|| Error::not_found(EntityKind::FleetTemplate, self.id))?;
        Self::check_spawn(save, &spawn)?;

        let id = Self::allocate_id(save)?;
        debug!("Copying fleet template ID {} as new ID {}", self.id, id);

        let object = ObjectHandle::new(save.tree_mut().copy_object(source.id()));
        Self::register(save, id, object, country, spawn, game)
    }

    /// Copies a template from another save, bringing its designs along
    pub fn copy_from(
        &self,
        source: &StellarisSave,
        save: &mut StellarisSave,
        country: Id,
        spawn: Option<FleetSpawn<'_>>,
        game: &mut GameDataContext,
    ) -> Result<FleetTemplateHandle, Error> {
        let country = save.get_country_by_id(country)?;
        let designs = self.designs(source)?;
        Self::check_spawn(save, &spawn)?;
        let id = Self::allocate_id(save)?;

        let mut remap = HashMap::new();
        for design in designs {
            if remap.contains_key(&design.id()) {
                continue;
            }
            let copy = design.copy_to(source, save)?;
            remap.insert(design.id(), copy.id());
        }

        debug!(
            "Copying fleet template ID {} as new ID {} across saves",
            self.id, id
        );

        let value = self.entry.value(source.tree());
        let copied = save.tree_mut().import(source.tree(), value);
        let object = copied
            .as_object()
            .map(ObjectHandle::new)
            .ok_or_else(|| Error::not_found(EntityKind::FleetTemplate, self.id))?;

        let tree = save.tree_mut();
        if let Some(list) = object
            .find(tree, "fleet_template_design")
            .and_then(|x| x.object(tree))
        {
            let records: Vec<_> = list.live_entries(tree).collect();
            for record in records {
                let design = record.find(tree, "design");
                let mapped = design
                    .and_then(|x| x.value(tree).as_id())
                    .and_then(|x| remap.get(&x).copied());
                if let (Some(design), Some(mapped)) = (design, mapped) {
                    design.set_value(tree, mapped);
                }
            }
        }

        Self::register(save, id, object, country, spawn, game)
    }

    /// Erases the template, unlinking it from its fleet and owners
    pub fn remove(&self, save: &mut StellarisSave) -> Result<(), Error> {
        debug!("Removing fleet template ID {}", self.id);
        let owners: Vec<_> = save
            .countries
            .values()
            .copied()
            .filter(|c| c.fleet_template_ids(save).contains(&self.id))
            .collect();
        for country in owners {
            country.unregister_fleet_template(save, self.id);
        }

        if let Some(fleet) = self.fleet_id(save).and_then(|id| save.find_fleet_by_id(id)) {
            if fleet.template_id(save) == Some(self.id) {
                fleet.set_template(save, None)?;
            }
        }

        erase(save, self.entry);
        save.fleet_templates.remove(&self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
ship_design={
	40={ name={ key="Warden" } ship_size="corvette" }
	41={ name={ key="Lancer" } ship_size="destroyer" }
}
fleet_template={
	16777300={
		fleet=7
		fleet_template_design={
			{ design=40 count=3 }
			{ design=41 }
		}
		count=4
	}
}
fleet={
	7={ fleet_template=16777300 }
}
country={
	0={
		fleet_template_manager={ fleet_template={ 16777300 } }
	}
}
"#;

    fn save() -> StellarisSave {
        StellarisSave::from_strs("", GAMESTATE).unwrap()
    }

    #[test]
    fn composition() {
        let save = save();
        let template = save.get_fleet_template_by_id(16777300).unwrap();
        assert_eq!(
            template.composition(&save),
            vec![CompositionEntry::new(40, 3), CompositionEntry::new(41, 1)]
        );
        assert_eq!(
            template.composition_description(&save).unwrap(),
            "3x Warden (corvette #40), 1x Lancer (destroyer #41)"
        );
        assert_eq!(template.fleet(&save).unwrap().map(|x| x.id()), Some(7));
    }

    #[test]
    fn edit_composition() {
        let mut save = save();
        let template = save.get_fleet_template_by_id(16777300).unwrap();
        template.add_design(&mut save, 41, 2).unwrap();
        template.remove_design(&mut save, 40, Some(1)).unwrap();
        assert_eq!(
            template.composition(&save),
            vec![CompositionEntry::new(40, 2), CompositionEntry::new(41, 3)]
        );

        template.remove_design(&mut save, 40, Some(2)).unwrap();
        template.remove_design(&mut save, 99, None).unwrap();
        assert_eq!(template.composition(&save), vec![CompositionEntry::new(41, 3)]);

        template.update_count(&mut save).unwrap();
        let tree = save.tree();
        let count = template.entry().find(tree, "count").map(|x| x.value(tree).as_id());
        assert_eq!(count, Some(Some(3)));
    }

    #[test]
    fn new_template_ids_scan_upward() {
        let mut save = save();
        let mut game = GameDataContext::new(None);
        let composition = [CompositionEntry::new(40, 2)];
        let a = FleetTemplateHandle::new(&mut save, 0, &composition, None, &mut game).unwrap();
        let b = FleetTemplateHandle::new(&mut save, 0, &composition, None, &mut game).unwrap();
        assert_eq!(a.id(), 16777301);
        assert_eq!(b.id(), 16777302);
        assert_eq!(a.composition(&save), composition.to_vec());
        assert_eq!(
            save.get_country_by_id(0).unwrap().fleet_template_ids(&save),
            vec![16777300, 16777301, 16777302]
        );

        let mut empty = StellarisSave::from_strs("", "country={ 0={ } }\n").unwrap();
        let first = FleetTemplateHandle::new(&mut empty, 0, &[], None, &mut game).unwrap();
        assert_eq!(first.id(), FIRST_TEMPLATE_ID);
    }

    #[test]
    fn template_ids_run_out() {
        let gamestate = "fleet_template={\n\t4294967294={\n\t\tcount=0\n\t}\n}\ncountry={\n\t0={\n\t}\n}\n";
        let mut save = StellarisSave::from_strs("", gamestate).unwrap();
        let mut game = GameDataContext::new(None);
        let err = FleetTemplateHandle::new(&mut save, 0, &[], None, &mut game).unwrap_err();
        assert_eq!(err.code(), "invalid-state/id-exhausted");
        assert_eq!(save.to_strings().1, gamestate);
    }

    #[test]
    fn unknown_design_leaves_save_untouched() {
        let mut save = save();
        let before = save.to_strings();
        let err = FleetTemplateHandle::new(
            &mut save,
            0,
            &[CompositionEntry::new(99, 1)],
            None,
            &mut GameDataContext::new(None),
        )
        .unwrap_err();
        assert_eq!(err.code(), "ship-design-not-found");
        assert_eq!(save.to_strings(), before);
    }

    #[test]
    fn copy_across_saves_remaps_designs() {
        let source = save();
        let template = source.get_fleet_template_by_id(16777300).unwrap();
        let mut target = StellarisSave::from_strs(
            "",
            "last_created_design=9\nship_design={ 9={ } }\ncountry={ 5={ } }\n",
        )
        .unwrap();

        let mut game = GameDataContext::new(None);
        let copy = template
            .copy_from(&source, &mut target, 5, None, &mut game)
            .unwrap();
        assert_eq!(
            copy.composition(&target),
            vec![CompositionEntry::new(10, 3), CompositionEntry::new(11, 1)]
        );
        assert_eq!(copy.fleet_id(&target), None);
        assert_eq!(
            target.get_country_by_id(5).unwrap().fleet_template_ids(&target),
            vec![copy.id()]
        );
    }

    #[test]
    fn remove_unlinks() {
        let mut save = save();
        let template = save.get_fleet_template_by_id(16777300).unwrap();
        template.remove(&mut save).unwrap();
        assert!(save.find_fleet_template_by_id(16777300).is_none());
        assert_eq!(save.get_fleet_by_id(7).unwrap().template_id(&save), None);
        assert!(save.get_country_by_id(0).unwrap().fleet_template_ids(&save).is_empty());
    }
}
