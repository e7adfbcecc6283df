use super::{field_text, set_field_quoted, CoordsHandle, Id, SystemHandle};
use crate::text::{EntryHandle, ObjectHandle, Value};
use crate::{Error, StellarisSave};

/// A top level `nebula={ ... }` entry
///
/// Nebulas have no id, so they are identified by their position among the
/// gamestate's nebula entries. More than one nebula may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NebulaHandle {
    index: usize,
    entry: EntryHandle,
}

impl NebulaHandle {
    pub(crate) fn new(index: usize, entry: EntryHandle) -> Self {
        NebulaHandle { index, entry }
    }

    /// Position among the nebulas of the gamestate
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entry(&self) -> EntryHandle {
        self.entry
    }

    fn object(&self, save: &StellarisSave) -> Option<ObjectHandle> {
        self.entry.object(save.tree())
    }

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

    /// Ids from the repeated `galactic_object` entries
    pub fn system_ids(&self, save: &StellarisSave) -> Vec<Id> {
        let tree = save.tree();
        self.entry
            .get_all(tree, "galactic_object")
            .into_iter()
            .filter_map(|x| x.value(tree).as_id())
            .collect()
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

    /// Returns false when the system was already inside
    pub fn add_system(&self, save: &mut StellarisSave, system: Id) -> Result<bool, Error> {
        if self.has_system(save, system) {
            return Ok(false);
        }

        let tree = save.tree_mut();
        let object = self.entry.value_as_object(tree)?;
        object.push(tree, "galactic_object", system);
        Ok(true)
    }

    /// Returns false when the system was not inside
    pub fn remove_system(&self, save: &mut StellarisSave, system: Id) -> bool {
        let object = match self.object(save) {
            Some(x) => x,
            None => return false,
        };

        let tree = save.tree();
        let found = object
            .get_all(tree, "galactic_object")
            .into_iter()
            .find(|x| x.value(tree).as_id() == Some(system));
        match found {
            Some(entry) => object.remove_entry(save.tree_mut(), entry),
            None => false,
        }
    }

    /// Drops the nebula from the gamestate
    pub fn remove(&self, save: &mut StellarisSave) {
        self.entry.set_value(save.tree_mut(), Value::Absent);
        save.nebulas.retain(|x| x.entry != self.entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
galactic_object={
	0={ name="A" }
	1={ name="B" }
}
nebula={
	coordinate={ x=10 y=20 origin=4294967295 }
	radius=30
	name="Veil"
	galactic_object=0
}
nebula={
	name="Veil"
	galactic_object=1
}
"#;

    #[test]
    fn membership() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let veil = save.find_nebula_by_system(0).unwrap();
        assert_eq!(veil.index(), 0);
        assert_eq!(veil.name(&save).as_deref(), Some("Veil"));
        assert_eq!(veil.coords(&save).unwrap().x(save.tree()), 10.0);

        assert!(veil.add_system(&mut save, 1).unwrap());
        assert!(!veil.add_system(&mut save, 1).unwrap());
        assert_eq!(veil.system_ids(&save), vec![0, 1]);
        assert_eq!(veil.systems(&save).unwrap().len(), 2);

        assert!(veil.remove_system(&mut save, 0));
        assert!(!veil.remove_system(&mut save, 0));
        assert!(!veil.has_system(&save, 0));
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let first = save.find_nebula_by_name("Veil").unwrap();
        assert_eq!(first.index(), 0);

        first.remove(&mut save);
        let next = save.find_nebula_by_name("Veil").unwrap();
        assert_eq!(next.index(), 1);
        assert_eq!(save.nebulas().count(), 1);
    }
}
