//! Typed views over the entities of a gamestate
//!
//! Every handle is a `Copy` pair of the entity's id and the index of the
//! entry that holds it. Reads take the [`StellarisSave`] by shared reference
//! and writes by mutable reference, so handles can be freely kept around
//! while the save is edited through other handles.
//!
//! Relationships are stored as numeric ids. Accessors ending in `_id` return
//! the raw reference while the plain name resolves it, failing with a
//! `<entity>-not-found` error when the referenced entity does not exist.

use crate::text::{EntryHandle, ObjectHandle, Value};
use crate::{EntityKind, Error, StellarisSave};

macro_rules! entity_handle {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            id: $crate::handles::Id,
            entry: $crate::text::EntryHandle,
        }

        impl $name {
            /// Binds the handle to an `<id>={ ... }` entry. `None` when the
            /// key is not numeric
            pub(crate) fn from_entry(
                tree: &$crate::text::Tree,
                entry: $crate::text::EntryHandle,
            ) -> Option<Self> {
                let id = entry.key(tree).as_id()?;
                Some($name { id, entry })
            }

            #[inline]
            pub fn id(&self) -> $crate::handles::Id {
                self.id
            }
        }

        impl $crate::handles::EntityHandle for $name {
            const KIND: $crate::EntityKind = $kind;

            #[inline]
            fn id(&self) -> $crate::handles::Id {
                self.id
            }

            #[inline]
            fn entry(&self) -> $crate::text::EntryHandle {
                self.entry
            }
        }
    };
}

mod army;
mod coords;
mod country;
mod fleet;
mod fleet_template;
mod leader;
mod nebula;
mod planet;
mod sector;
mod ship;
mod ship_design;
mod species;
mod system;

pub use self::army::ArmyHandle;
pub use self::coords::{CoordsData, CoordsHandle};
pub use self::country::{CountryHandle, FleetOwnership, ShipDesignCollection};
pub use self::fleet::{FleetHandle, FleetRemoval};
pub use self::fleet_template::{CompositionEntry, FleetSpawn, FleetTemplateHandle};
pub use self::leader::{LeaderHandle, LeaderLocation, LeaderRemoval, ScienceArea};
pub use self::nebula::NebulaHandle;
pub use self::planet::PlanetHandle;
pub use self::sector::SectorHandle;
pub use self::ship::{ShipHandle, ShipSection, ShipWeapon};
pub use self::ship_design::{
    DesignComponent, DesignSection, Hitpoints, HitpointsKind, ShipDesignHandle, SlotMap,
};
pub use self::species::SpeciesHandle;
pub use self::system::{
    Hyperlane, OnMissing, SystemHandle, FLAG_STAMP, PRECURSOR_FLAGS,
};

/// Numeric id of an entity
pub type Id = u32;

/// The "no entity" reference, eg: a system outside of any sector
pub const UNDEFINED_ID: Id = u32::MAX;

/// Coordinate origin meaning the galaxy itself rather than a system
pub const GALAXY_ORIGIN: Id = UNDEFINED_ID;

/// Shared behavior of handles bound to an `<id>={ ... }` entry of a
/// gamestate collection
pub trait EntityHandle: Copy {
    const KIND: EntityKind;

    fn id(&self) -> Id;

    /// The collection entry holding the entity
    fn entry(&self) -> EntryHandle;

    /// The entity's fields. `None` once the entity was removed
    fn object(&self, save: &StellarisSave) -> Option<ObjectHandle> {
        self.entry().object(save.tree())
    }

    fn is_live(&self, save: &StellarisSave) -> bool {
        self.object(save).is_some()
    }
}

/// Unquoted text of a nested field
pub(crate) fn field_text(save: &StellarisSave, entry: EntryHandle, path: &[&str]) -> Option<String> {
    let tree = save.tree();
    entry.find_path(tree, path)?.value(tree).unquoted()
}

pub(crate) fn field_f64(save: &StellarisSave, entry: EntryHandle, path: &[&str]) -> Option<f64> {
    let tree = save.tree();
    entry.find_path(tree, path)?.value(tree).as_f64()
}

/// An id reference. The undefined sentinel reads as `None`
pub(crate) fn field_id(save: &StellarisSave, entry: EntryHandle, path: &[&str]) -> Option<Id> {
    let tree = save.tree();
    entry
        .find_path(tree, path)?
        .value(tree)
        .as_id()
        .filter(|&x| x != UNDEFINED_ID)
}

/// The bare numeric elements of a list field
pub(crate) fn field_ids(save: &StellarisSave, entry: EntryHandle, path: &[&str]) -> Vec<Id> {
    let tree = save.tree();
    entry
        .find_path(tree, path)
        .map(|x| x.ids(tree))
        .unwrap_or_default()
}

/// Sets a nested field, creating the path as needed. Setting an absent
/// value never creates anything
pub(crate) fn set_field(
    save: &mut StellarisSave,
    entry: EntryHandle,
    path: &[&str],
    value: impl Into<Value>,
) -> Result<(), Error> {
    let value = value.into();
    let tree = save.tree_mut();
    if value.is_absent() {
        if let Some(field) = entry.find_path(tree, path) {
            field.set_value(tree, Value::Absent);
        }
        return Ok(());
    }

    let field = entry.get_path(tree, path)?;
    field.set_value(tree, value);
    Ok(())
}

pub(crate) fn set_field_quoted(
    save: &mut StellarisSave,
    entry: EntryHandle,
    path: &[&str],
    value: &str,
) -> Result<(), Error> {
    set_field(save, entry, path, Value::quoted(value))
}

/// Appends an id to a list field unless already listed. Returns whether it
/// was added
pub(crate) fn push_id(
    save: &mut StellarisSave,
    entry: EntryHandle,
    path: &[&str],
    id: Id,
) -> Result<bool, Error> {
    if field_ids(save, entry, path).contains(&id) {
        return Ok(false);
    }

    let tree = save.tree_mut();
    let list = entry.get_path(tree, path)?.value_as_object(tree)?;
    list.push_value(tree, id);
    Ok(true)
}

/// Removes an id from a list field. Returns whether it was listed
pub(crate) fn remove_id(
    save: &mut StellarisSave,
    entry: EntryHandle,
    path: &[&str],
    id: Id,
) -> bool {
    let tree = save.tree_mut();
    let list = match entry.find_path(tree, path).and_then(|x| x.object(tree)) {
        Some(x) => x,
        None => return false,
    };

    let view = &*tree;
    let found = list
        .entries(view)
        .find(|e| e.key(view).is_none() && e.value(view).as_id() == Some(id));
    match found {
        Some(element) => list.remove_entry(tree, element),
        None => false,
    }
}

/// Unquoted bare text elements of a list field, eg: `civics={ "a" "b" }`
pub(crate) fn field_texts(save: &StellarisSave, entry: EntryHandle, path: &[&str]) -> Vec<String> {
    let tree = save.tree();
    entry
        .find_path(tree, path)
        .and_then(|x| x.object(tree))
        .map(|list| {
            list.live_entries(tree)
                .filter_map(|e| e.value(tree).unquoted())
                .collect()
        })
        .unwrap_or_default()
}

/// Replaces a list field with quoted strings, each under `key` (or keyless)
pub(crate) fn set_field_texts(
    save: &mut StellarisSave,
    entry: EntryHandle,
    path: &[&str],
    key: Option<&str>,
    values: &[&str],
) -> Result<(), Error> {
    let tree = save.tree_mut();
    let field = entry.get_path(tree, path)?;
    let list = tree.new_object();
    field.set_value(tree, list);
    let list = ObjectHandle::new(list);
    for value in values {
        match key {
            Some(key) => list.push(tree, key, Value::quoted(value)),
            None => list.push_value(tree, Value::quoted(value)),
        };
    }
    Ok(())
}

/// Sets an entity entry's value to absent so it is dropped when written out
pub(crate) fn erase(save: &mut StellarisSave, entry: EntryHandle) {
    entry.set_value(save.tree_mut(), Value::Absent);
}
