use crate::text::{ObjectHandle, Tree, Value};
use crate::{Error, StellarisSave};

/// An entry of `species_db`
///
/// Species are referenced by their position in the database rather than by
/// an id, eg: an army's `species=3` is the fourth species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeciesHandle {
    index: usize,
    object: ObjectHandle,
}

impl SpeciesHandle {
    pub(crate) fn new(index: usize, object: ObjectHandle) -> Self {
        SpeciesHandle { index, object }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn object(&self) -> ObjectHandle {
        self.object
    }

    fn text(&self, tree: &Tree, key: &str) -> Option<String> {
        self.object.find(tree, key)?.value(tree).unquoted()
    }

    fn set_text(&self, save: &mut StellarisSave, key: &str, value: &str) {
        let tree = save.tree_mut();
        self.object.get(tree, key).set_value(tree, Value::quoted(value));
    }

    pub fn name(&self, save: &StellarisSave) -> Option<String> {
        self.text(save.tree(), "name")
    }

    pub fn set_name(&self, save: &mut StellarisSave, value: &str) {
        self.set_text(save, "name", value)
    }

    pub fn plural(&self, save: &StellarisSave) -> Option<String> {
        self.text(save.tree(), "plural")
    }

    pub fn set_plural(&self, save: &mut StellarisSave, value: &str) {
        self.set_text(save, "plural", value)
    }

    pub fn name_list(&self, save: &StellarisSave) -> Option<String> {
        self.text(save.tree(), "name_list")
    }

    pub fn set_name_list(&self, save: &mut StellarisSave, value: &str) {
        self.set_text(save, "name_list", value)
    }

    pub fn adjective(&self, save: &StellarisSave) -> Option<String> {
        self.text(save.tree(), "adjective")
    }

    pub fn set_adjective(&self, save: &mut StellarisSave, value: &str) {
        self.set_text(save, "adjective", value)
    }

    pub fn class(&self, save: &StellarisSave) -> Option<String> {
        self.text(save.tree(), "class")
    }

    pub fn set_class(&self, save: &mut StellarisSave, value: &str) {
        self.set_text(save, "class", value)
    }

    pub fn portrait(&self, save: &StellarisSave) -> Option<String> {
        self.text(save.tree(), "portrait")
    }

    pub fn set_portrait(&self, save: &mut StellarisSave, value: &str) {
        self.set_text(save, "portrait", value)
    }

    /// Trait keys from `traits={ trait="..." }`
    pub fn traits(&self, save: &StellarisSave) -> Vec<String> {
        let tree = save.tree();
        self.object
            .find(tree, "traits")
            .map(|traits| {
                traits
                    .get_all(tree, "trait")
                    .into_iter()
                    .filter_map(|x| x.value(tree).unquoted())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_trait(&self, save: &StellarisSave, name: &str) -> bool {
        self.traits(save).iter().any(|x| x == name)
    }

    /// Returns false when the species already had the trait
    pub fn add_trait(&self, save: &mut StellarisSave, name: &str) -> Result<bool, Error> {
        if self.has_trait(save, name) {
            return Ok(false);
        }

        let tree = save.tree_mut();
        let traits = self.object.get(tree, "traits").value_as_object(tree)?;
        traits.push(tree, "trait", Value::quoted(name));
        Ok(true)
    }

    /// Returns false when the species did not have the trait
    pub fn remove_trait(&self, save: &mut StellarisSave, name: &str) -> bool {
        let tree = save.tree();
        let traits = match self.object.find(tree, "traits").and_then(|x| x.object(tree)) {
            Some(x) => x,
            None => return false,
        };

        let found = traits
            .get_all(tree, "trait")
            .into_iter()
            .find(|x| x.value(tree).unquoted().as_deref() == Some(name));
        match found {
            Some(entry) => traits.remove_entry(save.tree_mut(), entry),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMESTATE: &str = r#"
species_db={
	0={
		name="Humans"
		plural="Humans"
		class="HUM"
		traits={ trait="trait_adaptive" trait="trait_nomadic" }
	}
	1={
		name="Blorg"
		class="MOL"
	}
}
"#;

    #[test]
    fn fields_and_traits() {
        let mut save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        let humans = save.get_species_by_index(0).unwrap();
        assert_eq!(humans.class(&save).as_deref(), Some("HUM"));
        assert_eq!(humans.traits(&save), vec!["trait_adaptive", "trait_nomadic"]);

        assert!(!humans.add_trait(&mut save, "trait_nomadic").unwrap());
        assert!(humans.remove_trait(&mut save, "trait_adaptive"));
        assert!(!humans.remove_trait(&mut save, "trait_adaptive"));
        assert_eq!(humans.traits(&save), vec!["trait_nomadic"]);

        let blorg = save.find_species_by_name("Blorg").unwrap();
        assert_eq!(blorg.index(), 1);
        assert!(blorg.traits(&save).is_empty());
        assert!(blorg.add_trait(&mut save, "trait_strong").unwrap());
        blorg.set_adjective(&mut save, "Blorgian");
        assert!(save.to_strings().1.contains("traits={\n\t\t\ttrait=\"trait_strong\"\n\t\t}"));
        assert_eq!(blorg.adjective(&save).as_deref(), Some("Blorgian"));
    }

    #[test]
    fn index_out_of_range() {
        let save = StellarisSave::from_strs("", GAMESTATE).unwrap();
        assert!(save.find_species_by_index(2).is_none());
        assert_eq!(save.get_species_by_index(2).unwrap_err().code(), "species-not-found");
    }
}
