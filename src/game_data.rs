//! Lookups into the installed game's `common/` data
//!
//! A [`GameDataContext`] is created once and handed to every operation that
//! needs game rules (ship sizes, component templates, scripted variables).
//! Categories are loaded lazily and merged across all `*.txt` files of the
//! category directory, in file name order.

use crate::text::{Entry, Key, ObjectHandle, Tree, TreeParser, Value};
use crate::{Error, ErrorKind};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Scripted variable substitutions, keyed with their `@` prefix
pub type Variables = HashMap<String, Value>;

pub const COMPONENT_TEMPLATES: &str = "common/component_templates";
pub const SHIP_SIZES: &str = "common/ship_sizes";
pub const SCRIPTED_VARIABLES: &str = "common/scripted_variables";

/// The broad class of a ship component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Utility,
    Weapon,
    StrikeCraft,
}

impl ComponentKind {
    /// Derives the kind from a game data key like `weapon_component_template`
    ///
    /// ```
    /// use stellaris_save::game_data::ComponentKind;
    /// assert_eq!(ComponentKind::from_template_key("weapon_component_template"), Some(ComponentKind::Weapon));
    /// assert_eq!(ComponentKind::from_template_key("strike_craft_component_template"), Some(ComponentKind::StrikeCraft));
    /// assert_eq!(ComponentKind::from_template_key("utility_component_template"), Some(ComponentKind::Utility));
    /// assert_eq!(ComponentKind::from_template_key("ship_size"), None);
    /// ```
    pub fn from_template_key(key: &str) -> Option<ComponentKind> {
        match key.strip_suffix("_component_template")? {
            "utility" => Some(ComponentKind::Utility),
            "weapon" => Some(ComponentKind::Weapon),
            "strike_craft" => Some(ComponentKind::StrikeCraft),
            _ => None,
        }
    }
}

/// A component template from game data, with variables already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTemplate {
    pub key: String,
    pub kind: ComponentKind,
    modifiers: Vec<(String, f64)>,
}

impl ComponentTemplate {
    /// A numeric modifier, eg: `ship_armor_add`
    pub fn modifier(&self, name: &str) -> Option<f64> {
        self.modifiers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, x)| *x)
    }

    pub fn modifiers(&self) -> &[(String, f64)] {
        &self.modifiers
    }
}

/// A ship size from game data
#[derive(Debug, Clone, PartialEq)]
pub struct ShipSize {
    pub key: String,
    pub max_hitpoints: f64,
}

/// Process scoped cache of game data
#[derive(Debug)]
pub struct GameDataContext {
    directory: Option<PathBuf>,
    critical: bool,
    tree: Tree,
    categories: HashMap<String, ObjectHandle>,
    // categories whose directory was already read
    loaded: HashSet<String>,
    variables: Option<Variables>,
    overrides: Variables,
    component_templates: Option<HashMap<String, ComponentTemplate>>,
    ship_sizes: Option<HashMap<String, ShipSize>>,
}

impl GameDataContext {
    /// Creates a context reading from the game installation directory.
    /// Without a directory only sources inserted with
    /// [`insert_source`](GameDataContext::insert_source) are available.
    pub fn new(directory: Option<PathBuf>) -> Self {
        GameDataContext {
            directory,
            critical: true,
            tree: Tree::new(),
            categories: HashMap::new(),
            loaded: HashSet::new(),
            variables: None,
            overrides: HashMap::new(),
            component_templates: None,
            ship_sizes: None,
        }
    }

    /// Whether unloadable data is an error (the default) or only a warning
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// Checks if a directory looks like a game installation
    pub fn test_directory(path: &Path) -> bool {
        path.join("common").is_dir()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    fn invalidate(&mut self) {
        self.variables = None;
        self.component_templates = None;
        self.ship_sizes = None;
    }

    fn category_root(&mut self, category: &str) -> ObjectHandle {
        if let Some(root) = self.categories.get(category) {
            return *root;
        }

        let root = ObjectHandle::new(self.tree.new_object());
        self.categories.insert(category.to_owned(), root);
        root
    }

    fn merge_text(&mut self, category: &str, text: &str) -> Result<(), Error> {
        let root = self.category_root(category);
        let parsed = TreeParser::new().parse_into(&mut self.tree, text)?;
        let entries = self.tree.object(parsed).to_vec();
        self.tree.object_mut(root.id()).extend(entries);
        Ok(())
    }

    /// Adds markup to a category as if it were one more file of it. The
    /// category's files on disk are still read on first use and merged after
    /// every inserted source.
    pub fn insert_source(&mut self, category: &str, text: &str) -> Result<(), Error> {
        self.merge_text(category, text)?;
        self.invalidate();
        Ok(())
    }

    /// Defines or overrides a scripted variable
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.overrides.insert(name.to_owned(), value.into());
        self.invalidate();
    }

    /// The merged root of a category with loaded or inserted content
    pub fn category(&self, category: &str) -> Option<ObjectHandle> {
        self.categories.get(category).copied()
    }

    fn degrade(&self, err: Error, what: &str) -> Result<(), Error> {
        if self.critical {
            Err(err)
        } else {
            warn!(
                "{}, content will be omitted which might result in incomplete data: {}",
                what, err
            );
            Ok(())
        }
    }

    /// Loads (once) and returns the merged root of a category like
    /// `common/ship_sizes`
    pub fn load_category(&mut self, category: &str) -> Result<ObjectHandle, Error> {
        if !self.loaded.contains(category) {
            self.read_category(category)?;
            self.loaded.insert(category.to_owned());
        }

        Ok(self.category_root(category))
    }

    fn read_category(&mut self, category: &str) -> Result<(), Error> {
        let directory = match &self.directory {
            Some(x) => x.join(category),
            None if self.categories.contains_key(category) => return Ok(()),
            None => {
                let err = Error::game_data(
                    "game-data/no-game-directory",
                    format!("game directory not set, can't load '{}'", category),
                );
                return self.degrade(err, "game data unavailable");
            }
        };

        let mut files = match std::fs::read_dir(&directory) {
            Ok(dir) => dir
                .filter_map(|x| x.ok())
                .map(|x| x.path())
                .filter(|x| x.is_file() && x.extension().map_or(false, |ext| ext == "txt"))
                .collect::<Vec<_>>(),
            Err(e) => {
                let err = Error::game_data(
                    "game-data/io",
                    format!("unable to read '{}': {}", directory.display(), e),
                );
                return self.degrade(err, "game data directory unreadable");
            }
        };
        files.sort();

        for file in files {
            debug!(
                "Loading game data for '{}'... Current file: {}",
                category,
                file.display()
            );
            let text = match std::fs::read(&file) {
                Ok(x) => String::from_utf8_lossy(&x).into_owned(),
                Err(e) => {
                    let err = Error::game_data(
                        "game-data/io",
                        format!("unable to read '{}': {}", file.display(), e),
                    );
                    self.degrade(err, "game data file unreadable")?;
                    continue;
                }
            };

            // game files are often written with a byte order mark
            let text = text.trim_start_matches('\u{feff}');
            if let Err(e) = self.merge_text(category, text) {
                let e = match e.into_kind() {
                    ErrorKind::Parse(p) => Error::from(p.with_path(&file)),
                    other => Error::new(other),
                };
                self.degrade(e, "error while parsing game data")?;
            }
        }

        self.invalidate();
        Ok(())
    }

    /// Every scripted variable: the `@name = value` entries found at the top
    /// of any loaded file plus the `common/scripted_variables` category
    pub fn variables(&mut self) -> Result<&Variables, Error> {
        if self.variables.is_none() {
            if self.directory.is_some() {
                self.load_category(SCRIPTED_VARIABLES)?;
            }

            let mut variables = Variables::new();
            for root in self.categories.values() {
                variables.extend(collect_variables(&self.tree, *root));
            }

            variables.extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
            self.variables = Some(variables);
        }

        let variables: &Variables = self.variables.get_or_insert_with(Variables::new);
        Ok(variables)
    }

    /// Every component template, keyed by its `key`
    pub fn component_templates(&mut self) -> Result<&HashMap<String, ComponentTemplate>, Error> {
        if self.component_templates.is_none() {
            let root = self.load_category(COMPONENT_TEMPLATES)?;
            let variables = self.variables()?.clone();
            let critical = self.critical;
            evaluate_variables(&mut self.tree, root, &variables, critical)?;

            let mut templates = HashMap::new();
            for entry in root.live_entries(&self.tree) {
                let kind = match entry
                    .key(&self.tree)
                    .as_text()
                    .and_then(ComponentKind::from_template_key)
                {
                    Some(x) => x,
                    None => continue,
                };

                let key = match entry.find(&self.tree, "key") {
                    Some(x) => x.value(&self.tree).unquoted().unwrap_or_default(),
                    None => continue,
                };

                let modifiers = entry
                    .find(&self.tree, "modifier")
                    .and_then(|x| x.object(&self.tree))
                    .map(|m| {
                        m.live_entries(&self.tree)
                            .filter_map(|e| {
                                let name = e.key(&self.tree).as_text()?;
                                let value = e.value(&self.tree).as_f64()?;
                                Some((name.to_owned(), value))
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                templates.insert(
                    key.clone(),
                    ComponentTemplate {
                        key,
                        kind,
                        modifiers,
                    },
                );
            }

            debug!("Loaded {} component templates", templates.len());
            self.component_templates = Some(templates);
        }

        let templates: &HashMap<_, _> = self.component_templates.get_or_insert_with(HashMap::new);
        Ok(templates)
    }

    /// Finds a component template by key
    pub fn component_template(&mut self, key: &str) -> Result<&ComponentTemplate, Error> {
        self.component_templates()?.get(key).ok_or_else(|| {
            Error::game_data(
                "game-data/component-template-not-found",
                format!("component template not found by key '{}'", key),
            )
        })
    }

    /// Finds a ship size by key
    pub fn ship_size(&mut self, key: &str) -> Result<&ShipSize, Error> {
        if self.ship_sizes.is_none() {
            let root = self.load_category(SHIP_SIZES)?;
            let variables = self.variables()?.clone();
            let critical = self.critical;
            evaluate_variables(&mut self.tree, root, &variables, critical)?;

            let mut sizes = HashMap::new();
            for entry in root.live_entries(&self.tree) {
                let key = match entry.key(&self.tree).as_text() {
                    Some(x) if !x.starts_with('@') => x.to_owned(),
                    _ => continue,
                };
                let max_hitpoints = entry
                    .find(&self.tree, "max_hitpoints")
                    .and_then(|x| x.value(&self.tree).as_f64())
                    .unwrap_or(0.0);
                sizes.insert(key.clone(), ShipSize { key, max_hitpoints });
            }
            self.ship_sizes = Some(sizes);
        }

        self.ship_sizes
            .get_or_insert_with(HashMap::new)
            .get(key)
            .ok_or_else(|| {
                Error::game_data(
                    "game-data/ship-design/missing-ship-size",
                    format!("ship size '{}' not found in game data", key),
                )
            })
    }
}

/// Replaces every `@variable` value under the object (recursively) with its
/// definition. Unresolved references are an error when `critical`, otherwise
/// they are logged and left alone. Returns the number of replacements.
///
/// ```
/// use stellaris_save::game_data::{evaluate_variables, Variables};
/// use stellaris_save::text::{Document, Value};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut doc = Document::parse("max_hitpoints = @corvette_hp")?;
/// let mut variables = Variables::new();
/// variables.insert(String::from("@corvette_hp"), Value::from(300u32));
/// let root = doc.root();
/// assert_eq!(evaluate_variables(doc.tree_mut(), root, &variables, true)?, 1);
/// assert_eq!(doc.to_string(), "max_hitpoints=300\n");
/// # Ok(())
/// # }
/// ```
pub fn evaluate_variables(
    tree: &mut Tree,
    object: ObjectHandle,
    variables: &Variables,
    critical: bool,
) -> Result<usize, Error> {
    let mut replaced = 0;
    let mut pending = vec![object];
    while let Some(current) = pending.pop() {
        let children: Vec<_> = current.entries(tree).collect();
        for entry in children {
            let name = match entry.value(tree) {
                Value::Object(x) => {
                    pending.push(ObjectHandle::new(*x));
                    continue;
                }
                Value::Text(x) if x.starts_with('@') => x.clone(),
                _ => continue,
            };

            match variables.get(&name) {
                Some(value) => {
                    entry.set_value(tree, value.clone());
                    replaced += 1;
                }
                None if critical => {
                    return Err(Error::game_data(
                        "game-data/unresolved-variable",
                        format!("scripted variable '{}' is not defined", name),
                    ))
                }
                None => warn!("scripted variable '{}' is not defined", name),
            }
        }
    }

    Ok(replaced)
}

/// Collects the `@name = value` definitions at the top of an object
pub fn collect_variables(tree: &Tree, object: ObjectHandle) -> Variables {
    object
        .live_entries(tree)
        .filter_map(|e| match tree.entry(e.id()) {
            Entry {
                key: Key::Text(name),
                value: value @ (Value::Text(_) | Value::Number(_)),
                ..
            } if name.starts_with('@') => Some((name.clone(), value.clone())),
            _ => None,
        })
        .collect()
}
