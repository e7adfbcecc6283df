use super::{field_text, set_field, set_field_quoted, EntityHandle, Id};
use crate::game_data::GameDataContext;
use crate::text::{Entry, EntryHandle, ObjectHandle, Tree, Value};
use crate::{EntityKind, Error, StellarisSave};
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The three kinds of ship hitpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitpointsKind {
    Hull,
    Armor,
    Shield,
}

impl HitpointsKind {
    pub const ALL: [HitpointsKind; 3] = [HitpointsKind::Hull, HitpointsKind::Armor, HitpointsKind::Shield];

    pub fn name(self) -> &'static str {
        match self {
            HitpointsKind::Hull => "hull",
            HitpointsKind::Armor => "armor",
            HitpointsKind::Shield => "shield",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hitpoints {
    pub hull: f64,
    pub armor: f64,
    pub shield: f64,
}

impl Hitpoints {
    pub fn get(&self, kind: HitpointsKind) -> f64 {
        match kind {
            HitpointsKind::Hull => self.hull,
            HitpointsKind::Armor => self.armor,
            HitpointsKind::Shield => self.shield,
        }
    }

    pub fn get_mut(&mut self, kind: HitpointsKind) -> &mut f64 {
        match kind {
            HitpointsKind::Hull => &mut self.hull,
            HitpointsKind::Armor => &mut self.armor,
            HitpointsKind::Shield => &mut self.shield,
        }
    }
}

/// Handles keyed by their `slot`, in the order they appear
///
/// Slots are assumed unique within their parent. When they are not, the
/// first one wins for lookups while iteration still yields every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMap<H> {
    entries: Vec<(String, H)>,
}

impl<H> SlotMap<H> {
    pub fn get(&self, slot: &str) -> Option<&H> {
        self.entries
            .iter()
            .find(|(key, _)| key == slot)
            .map(|(_, x)| x)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &H)> + '_ {
        self.entries.iter().map(|(key, x)| (key.as_str(), x))
    }

    pub fn values(&self) -> impl Iterator<Item = &H> + '_ {
        self.entries.iter().map(|(_, x)| x)
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H> FromIterator<(String, H)> for SlotMap<H> {
    fn from_iter<T: IntoIterator<Item = (String, H)>>(iter: T) -> Self {
        SlotMap {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Collects the live `key={ slot="..." ... }` children of an object
pub(crate) fn slot_map<H>(
    tree: &Tree,
    object: Option<ObjectHandle>,
    key: &str,
    wrap: impl Fn(EntryHandle) -> H,
) -> SlotMap<H> {
    let object = match object {
        Some(x) => x,
        None => return SlotMap { entries: Vec::new() },
    };

    object
        .get_all(tree, key)
        .into_iter()
        .filter(|x| x.object(tree).is_some())
        .map(|x| {
            let slot = x
                .find(tree, "slot")
                .and_then(|s| s.value(tree).unquoted())
                .unwrap_or_default();
            (slot, wrap(x))
        })
        .collect()
}

/// Finds the `key` child whose slot matches
fn find_slot(tree: &Tree, object: ObjectHandle, key: &str, slot: &str) -> Option<EntryHandle> {
    object.get_all(tree, key).into_iter().find(|x| {
        x.find(tree, "slot")
            .and_then(|s| s.value(tree).unquoted())
            .map_or(false, |s| s == slot)
    })
}

fn text(tree: &Tree, entry: EntryHandle, key: &str) -> Option<String> {
    entry.find(tree, key)?.value(tree).unquoted()
}

/// A `section={ template slot component... }` of a design
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesignSection {
    entry: EntryHandle,
}

impl DesignSection {
    pub fn entry(&self) -> EntryHandle {
        self.entry
    }

    pub fn slot(&self, tree: &Tree) -> Option<String> {
        text(tree, self.entry, "slot")
    }

    /// The section template key, eg: `CORVETTE_MID_M1S2`
    pub fn template(&self, tree: &Tree) -> Option<String> {
        text(tree, self.entry, "template")
    }

    pub fn set_template(&self, tree: &mut Tree, value: &str) -> Result<(), Error> {
        self.entry.get(tree, "template")?.set_value(tree, Value::quoted(value));
        Ok(())
    }

    pub fn components(&self, tree: &Tree) -> SlotMap<DesignComponent> {
        slot_map(tree, self.entry.object(tree), "component", |entry| DesignComponent { entry })
    }

    /// Installs a component in a slot, or empties the slot with `None`. New
    /// components go right after the section's own `slot` entry
    pub fn set_component(&self, tree: &mut Tree, slot: &str, template: Option<&str>) -> Result<(), Error> {
        let object = self.entry.value_as_object(tree)?;
        match (find_slot(tree, object, "component", slot), template) {
            (Some(existing), Some(template)) => {
                existing.get(tree, "template")?.set_value(tree, Value::quoted(template));
            }
            (Some(existing), None) => {
                object.remove_entry(tree, existing);
            }
            (None, Some(template)) => {
                let component = ObjectHandle::new(tree.new_object());
                component.push(tree, "slot", Value::quoted(slot));
                component.push(tree, "template", Value::quoted(template));
                let index = object
                    .find(tree, "slot")
                    .and_then(|x| object.position(tree, x))
                    .map_or(0, |x| x + 1);
                object.insert(tree, index, Entry::new("component", component.id()));
            }
            (None, None) => {}
        }
        Ok(())
    }
}

/// A `component={ slot template }` of a design section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesignComponent {
    entry: EntryHandle,
}

impl DesignComponent {
    pub fn slot(&self, tree: &Tree) -> Option<String> {
        text(tree, self.entry, "slot")
    }

    /// Key of the component template in game data
    pub fn template(&self, tree: &Tree) -> Option<String> {
        text(tree, self.entry, "template")
    }

    pub fn set_template(&self, tree: &mut Tree, value: &str) -> Result<(), Error> {
        self.entry.get(tree, "template")?.set_value(tree, Value::quoted(value));
        Ok(())
    }
}

entity_handle!(
    /// An entry of `ship_design`
    ShipDesignHandle,
    EntityKind::ShipDesign
);

impl ShipDesignHandle {
    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["name", "key"])
    }

    /// Renames the design, or drops the name with `None`
    pub fn set_name(&self, save: &mut StellarisSave, name: Option<&str>) -> Result<(), Error> {
        set_field(save, self.entry, &["name", "key"], name.map(Value::quoted))
    }

    /// eg: `corvette`
    pub fn ship_size(&self, save: &StellarisSave) -> Option<String> {
        field_text(save, self.entry, &["ship_size"])
    }

    pub fn set_ship_size(&self, save: &mut StellarisSave, value: &str) -> Result<(), Error> {
        set_field_quoted(save, self.entry, &["ship_size"], value)
    }

    pub fn sections(&self, save: &StellarisSave) -> SlotMap<DesignSection> {
        let tree = save.tree();
        slot_map(tree, self.entry.object(tree), "section", |entry| DesignSection { entry })
    }

    /// Sets the template of the section in a slot, or removes the section
    /// with `None`. New sections go right after `ship_size`
    pub fn set_section(
        &self,
        save: &mut StellarisSave,
        slot: &str,
        template: Option<&str>,
    ) -> Result<(), Error> {
        let tree = save.tree_mut();
        let object = self.entry.value_as_object(tree)?;
        match (find_slot(tree, object, "section", slot), template) {
            (Some(existing), Some(template)) => {
                existing.get(tree, "template")?.set_value(tree, Value::quoted(template));
            }
            (Some(existing), None) => {
                object.remove_entry(tree, existing);
            }
            (None, Some(template)) => {
                let section = ObjectHandle::new(tree.new_object());
                section.push(tree, "template", Value::quoted(template));
                section.push(tree, "slot", Value::quoted(slot));
                let index = object
                    .find(tree, "ship_size")
                    .and_then(|x| object.position(tree, x))
                    .map_or(0, |x| x + 1);
                object.insert(tree, index, Entry::new("section", section.id()));
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Keys from the repeated `required_component` entries
    pub fn required_components(&self, save: &StellarisSave) -> Vec<String> {
        let tree = save.tree();
        self.entry
            .get_all(tree, "required_component")
            .into_iter()
            .filter_map(|x| x.value(tree).unquoted())
            .collect()
    }

    pub fn set_required_components(
        &self,
        save: &mut StellarisSave,
        components: &[&str],
    ) -> Result<(), Error> {
        let tree = save.tree_mut();
        let object = self.entry.value_as_object(tree)?;
        object.remove_all_by_key(tree, "required_component");
        for component in components {
            object.push(tree, "required_component", Value::quoted(component));
        }
        Ok(())
    }

    /// Maximum hitpoints of a ship built from the design: the ship size's
    /// hull, plus flat bonuses of every component, each kind then scaled by
    /// the sum of the components' multipliers
    pub fn calculate_max_hitpoints(
        &self,
        save: &StellarisSave,
        game: &mut GameDataContext,
    ) -> Result<Hitpoints, Error> {
        let size = self.ship_size(save).ok_or_else(|| {
            Error::game_data(
                "game-data/ship-design/missing-ship-size",
                format!("ship design {} has no ship size", self.id),
            )
        })?;

        let mut hitpoints = Hitpoints {
            hull: game.ship_size(&size)?.max_hitpoints,
            ..Hitpoints::default()
        };
        let mut multipliers = Hitpoints::default();

        let tree = save.tree();
        for section in self.sections(save).values() {
            for component in section.components(tree).values() {
                let key = match component.template(tree) {
                    Some(x) => x,
                    None => continue,
                };

                let template = game.component_template(&key)?;
                for kind in HitpointsKind::ALL {
                    if let Some(x) = template.modifier(&format!("ship_{}_add", kind.name())) {
                        *hitpoints.get_mut(kind) += x;
                    }

                    if let Some(x) = template.modifier(&format!("ship_{}_mult", kind.name())) {
                        *multipliers.get_mut(kind) += x;
                    }
                }
            }
        }

        for kind in HitpointsKind::ALL {
            *hitpoints.get_mut(kind) += multipliers.get(kind) * hitpoints.get(kind);
        }

        Ok(hitpoints)
    }

    fn register_copy(save: &mut StellarisSave, source: Id, object: ObjectHandle) -> Result<ShipDesignHandle, Error> {
        let id = save.allocate_counter_id("last_created_design", |save, id| {
            save.find_ship_design_by_id(id).is_some()
        })?;
        debug!("Copying ship design ID {} as new ID {}", source, id);

        let entry = save.push_entity(&["ship_design"], id, object)?;
        let design = ShipDesignHandle { id, entry };
        save.ship_designs.insert(id, design);
        Ok(design)
    }

    /// Duplicates the design within its save under a new id
    pub fn copy(&self, save: &mut StellarisSave) -> Result<ShipDesignHandle, Error> {
        let object = self.object(save).ok_or_else(|| Error::not_found(EntityKind::ShipDesign, self.id))?;
        let copy = ObjectHandle::new(save.tree_mut().copy_object(object.id()));
        ShipDesignHandle::register_copy(save, self.id, copy)
    }

    /// Copies the design from its save into another one under a new id
    pub fn copy_to(&self, from: &StellarisSave, to: &mut StellarisSave) -> Result<ShipDesignHandle, Error> {
        let value = self.entry.value(from.tree());
        let copy = to.tree_mut().import(from.tree(), value);
        let object = copy
            .as_object()
            .map(ObjectHandle::new)
            .ok_or_else(|| Error::not_found(EntityKind::ShipDesign, self.id))?;
        debug!("Copying ship design ID {} across saves", self.id);
        ShipDesignHandle::register_copy(to, self.id, object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const SHIP_SIZES: &str = r#"
@corvette_hp = 300
corvette = { max_hitpoints = @corvette_hp }
"#;

    pub(crate) const COMPONENTS: &str = r#"
utility_component_template = {
	key = "SMALL_ARMOR_1"
	modifier = { ship_armor_add = 50 ship_hull_mult = 0.1 }
}
utility_component_template = {
	key = "SMALL_SHIELD_1"
	modifier = { ship_shield_add = 40 }
}
weapon_component_template = {
	key = "SMALL_MASS_DRIVER_1"
}
"#;

    const GAMESTATE: &str = r#"
last_created_design=41
ship_design={
	40={
		name={ key="Warden" }
		ship_size="corvette"
		section={
			template="CORVETTE_MID_M1S2"
			slot="mid"
			component={ slot="SMALL_GUN_01" template="SMALL_MASS_DRIVER_1" }
			component={ slot="SMALL_UTILITY_1" template="SMALL_ARMOR_1" }
			component={ slot="SMALL_UTILITY_2" template="SMALL_SHIELD_1" }
		}
		required_component="SHIELD_GENERATOR_1"
		required_component="COMBAT_COMPUTER_1"
	}
}
"#;

    fn game() -> GameDataContext {
        let mut game = GameDataContext::new(None);
        game.insert_source(crate::game_data::SHIP_SIZES, SHIP_SIZES).unwrap();
        game.insert_source(crate::game_data::COMPONENT_TEMPLATES, COMPONENTS)
            .unwrap();
        game
    }

    #[test]
    fn sections_by_slot() {
        let save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let design = save.get_ship_design_by_id(40).unwrap();
        let tree = save.tree();
        let sections = design.sections(&save);
        assert_eq!(sections.slots().collect::<Vec<_>>(), vec!["mid"]);

        let mid = sections.get("mid").unwrap();
        assert_eq!(mid.template(tree).as_deref(), Some("CORVETTE_MID_M1S2"));
        let components = mid.components(tree);
        assert_eq!(components.len(), 3);
        assert_eq!(
            components.get("SMALL_UTILITY_2").and_then(|x| x.template(tree)).as_deref(),
            Some("SMALL_SHIELD_1")
        );
        assert_eq!(
            design.required_components(&save),
            vec!["SHIELD_GENERATOR_1", "COMBAT_COMPUTER_1"]
        );
    }

    #[test]
    fn edit_slots_in_place() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let design = save.get_ship_design_by_id(40).unwrap();
        design.set_section(&mut save, "stern", Some("CORVETTE_STERN_S1")).unwrap();
        assert_eq!(design.sections(&save).slots().collect::<Vec<_>>(), vec!["stern", "mid"]);

        let mid = *design.sections(&save).get("mid").unwrap();
        mid.set_component(save.tree_mut(), "SMALL_UTILITY_1", None).unwrap();
        mid.set_component(save.tree_mut(), "SMALL_GUN_01", Some("SMALL_LASER_1")).unwrap();
        mid.set_component(save.tree_mut(), "AUX", Some("SENSOR_1")).unwrap();

        let tree = save.tree();
        let components = mid.components(tree);
        assert_eq!(
            components.slots().collect::<Vec<_>>(),
            vec!["AUX", "SMALL_GUN_01", "SMALL_UTILITY_2"]
        );
        assert_eq!(
            components.get("SMALL_GUN_01").and_then(|x| x.template(tree)).as_deref(),
            Some("SMALL_LASER_1")
        );
    }

    #[test]
    fn max_hitpoints() {
        let save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let design = save.get_ship_design_by_id(40).unwrap();
        let hp = design.calculate_max_hitpoints(&save, &mut game()).unwrap();
        assert_eq!(
            hp,
            Hitpoints {
                hull: 330.0,
                armor: 50.0,
                shield: 40.0
            }
        );
    }

    #[test]
    fn unknown_component_fails() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let design = save.get_ship_design_by_id(40).unwrap();
        let mid = *design.sections(&save).get("mid").unwrap();
        mid.set_component(save.tree_mut(), "X", Some("NOPE")).unwrap();
        let err = design.calculate_max_hitpoints(&save, &mut game()).unwrap_err();
        assert_eq!(err.code(), "game-data/component-template-not-found");
    }

    #[test]
    fn copies_get_fresh_ids() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let design = save.get_ship_design_by_id(40).unwrap();
        let copy = design.copy(&mut save).unwrap();
        assert_eq!(copy.id(), 42);
        copy.set_name(&mut save, Some("Copy")).unwrap();
        assert_eq!(design.name(&save).as_deref(), Some("Warden"));

        let mut other = StellarisSave::from_strs("", "last_created_design=3\n").unwrap();
        let foreign = design.copy_to(&save, &mut other).unwrap();
        assert_eq!(foreign.id(), 4);
        assert_eq!(foreign.ship_size(&other).as_deref(), Some("corvette"));
        assert!(other.to_strings().1.contains("last_created_design=4"));
    }
}
