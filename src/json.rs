//! Converts markup trees to JSON
//!
//! ```
//! use stellaris_save::text::Document;
//! use stellaris_save::json::{JsonOptions, DuplicateKeyMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::parse("core=a core=b")?;
//!
//! let options = JsonOptions::new()
//!     .with_prettyprint(false)
//!     .with_duplicate_keys(DuplicateKeyMode::Preserve);
//!
//! let actual = doc.root().json(doc.tree()).with_options(options).to_string();
//! assert_eq!(actual, r#"{"core":"a","core":"b"}"#);
//! # Ok(())
//! # }
//! ```
//!
//! Objects made only of bare elements are arrays, and entries written with
//! an operator other than `=` are wrapped in an object named after the
//! operator:
//!
//! ```
//! use stellaris_save::text::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::parse("ships={ 1 2 } size>=3 capital=yes")?;
//! let value = doc.root().to_json(doc.tree());
//! assert_eq!(
//!     value,
//!     serde_json::json!({"ships": [1, 2], "size": {"GREATER_THAN_EQUAL": 3}, "capital": true})
//! );
//! # Ok(())
//! # }
//! ```

use crate::text::{unquote, EntryHandle, Key, ObjectHandle, Operator, Tree, Value};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};
use std::collections::BTreeMap;

/// Customizes the JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    /// Controls if the JSON should be pretty printed
    pretty: bool,

    /// Controls the how duplicate keys are formatted
    duplicate_keys: DuplicateKeyMode,
}

impl JsonOptions {
    pub fn new() -> Self {
        JsonOptions::default()
    }

    /// Sets if the JSON should be pretty printed or minified
    pub fn with_prettyprint(mut self, pretty: bool) -> JsonOptions {
        self.pretty = pretty;
        self
    }

    /// Sets how duplicate keys are formatted
    pub fn with_duplicate_keys(mut self, duplicate_keys: DuplicateKeyMode) -> JsonOptions {
        self.duplicate_keys = duplicate_keys;
        self
    }
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            duplicate_keys: DuplicateKeyMode::Group,
        }
    }
}

/// Controls JSON structure when duplicate keys are encountered
///
/// Saves repeat keys all the time (`ethic=... ethic=...`, `nebula={...}
/// nebula={...}`), and most JSON consumers keep only the last of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKeyMode {
    /// Group values into an array under a single field (the default)
    ///
    /// ```
    /// use stellaris_save::text::Document;
    /// use stellaris_save::json::JsonOptions;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let doc = Document::parse("a={b=1} c={b=1 b=2}")?;
    /// let actual = doc.root().json(doc.tree()).with_options(JsonOptions::new()).to_string();
    /// assert_eq!(actual, r#"{"a":{"b":1},"c":{"b":[1,2]}}"#);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// Groups are positioned where the key first appears.
    Group,

    /// Preserve the duplicate keys in their original positions
    ///
    /// The output is not representable as a `serde_json::Value`, so this
    /// mode only applies to the writer based outputs.
    Preserve,
}

fn writer_json<W, S>(writer: W, pretty: bool, ser: S) -> Result<(), std::io::Error>
where
    W: std::io::Write,
    S: Serialize,
{
    let result = if pretty {
        serde_json::to_writer_pretty(writer, &ser)
    } else {
        serde_json::to_writer(writer, &ser)
    };

    result.map_err(|e| e.into())
}

/// Creates JSON from an object of a tree
#[derive(Debug, Clone, Copy)]
pub struct JsonObjectBuilder<'a> {
    tree: &'a Tree,
    object: ObjectHandle,
    options: JsonOptions,
}

impl<'a> JsonObjectBuilder<'a> {
    /// Output JSON with the set of options
    pub fn with_options(mut self, options: JsonOptions) -> Self {
        self.options = options;
        self
    }

    /// Output JSON to the given writer
    pub fn to_writer<W>(self, writer: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        writer_json(writer, self.options.pretty, self)
    }

    /// Output JSON to a string
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(self) -> String {
        let result = if self.options.pretty {
            serde_json::to_string_pretty(&self)
        } else {
            serde_json::to_string(&self)
        };

        // Every map key is a string and nothing else can fail
        result.unwrap_or_default()
    }

    /// Output JSON as a value. Duplicate keys are always grouped
    pub fn to_value(self) -> serde_json::Value {
        let grouped = self.with_options(self.options.with_duplicate_keys(DuplicateKeyMode::Group));
        serde_json::to_value(grouped).unwrap_or(serde_json::Value::Null)
    }
}

impl ObjectHandle {
    /// Converts the object to its JSON representation
    pub fn json(self, tree: &Tree) -> JsonObjectBuilder<'_> {
        JsonObjectBuilder {
            tree,
            object: self,
            options: JsonOptions::default(),
        }
    }

    /// The object as a JSON value with duplicate keys grouped
    pub fn to_json(self, tree: &Tree) -> serde_json::Value {
        self.json(tree).to_value()
    }
}

fn key_string(key: &Key) -> String {
    match key {
        Key::Text(x) => unquote(x),
        _ => key.to_string(),
    }
}

fn serialize_text<S>(value: &Value, raw: &str, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value.as_bool() {
        Some(x) => s.serialize_bool(x),
        None => s.serialize_str(&unquote(raw)),
    }
}

fn serialize_number<S>(literal: &str, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    // Only literals that read back the same are numbers, dates such as
    // 2200.01.01 and out of range integers stay text
    if let Ok(x) = literal.parse::<i64>() {
        return s.serialize_i64(x);
    }

    if let Ok(x) = literal.parse::<u64>() {
        return s.serialize_u64(x);
    }

    match literal.parse::<f64>() {
        Ok(x) if x.is_finite() && literal.contains('.') => s.serialize_f64(x),
        _ => s.serialize_str(literal),
    }
}

struct JsonValue<'a> {
    tree: &'a Tree,
    value: &'a Value,
    options: JsonOptions,
}

impl<'a> Serialize for JsonValue<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.value {
            Value::Absent => serializer.serialize_none(),
            Value::Text(raw) => serialize_text(self.value, raw, serializer),
            Value::Number(x) => serialize_number(x.as_str(), serializer),
            Value::Object(id) => JsonObjectBuilder {
                tree: self.tree,
                object: ObjectHandle::new(*id),
                options: self.options,
            }
            .serialize(serializer),
        }
    }
}

struct OperatorValue<'a> {
    tree: &'a Tree,
    entry: EntryHandle,
    options: JsonOptions,
}

impl<'a> Serialize for OperatorValue<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = JsonValue {
            tree: self.tree,
            value: self.entry.value(self.tree),
            options: self.options,
        };

        match self.entry.operator(self.tree) {
            Operator::Equal => value.serialize(serializer),
            op => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(op.name(), &value)?;
                map.end()
            }
        }
    }
}

struct Elements<'a> {
    tree: &'a Tree,
    entries: Vec<EntryHandle>,
    options: JsonOptions,
}

impl<'a> Serialize for Elements<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for &entry in &self.entries {
            seq.serialize_element(&OperatorValue {
                tree: self.tree,
                entry,
                options: self.options,
            })?;
        }
        seq.end()
    }
}

impl<'a> Serialize for JsonObjectBuilder<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let tree = self.tree;
        let (elements, fields): (Vec<_>, Vec<_>) = self
            .object
            .live_entries(tree)
            .partition(|x| x.key(tree).is_none());

        if fields.is_empty() && !elements.is_empty() {
            return Elements {
                tree,
                entries: elements,
                options: self.options,
            }
            .serialize(serializer);
        }

        let mut map = serializer.serialize_map(None)?;
        match self.options.duplicate_keys {
            DuplicateKeyMode::Preserve => {
                for entry in fields {
                    let v = OperatorValue {
                        tree,
                        entry,
                        options: self.options,
                    };
                    map.serialize_entry(&key_string(entry.key(tree)), &v)?;
                }
            }
            DuplicateKeyMode::Group => {
                let mut order = Vec::new();
                let mut groups: BTreeMap<String, Vec<EntryHandle>> = BTreeMap::new();
                for entry in fields {
                    let key = key_string(entry.key(tree));
                    let group = groups.entry(key.clone()).or_default();
                    if group.is_empty() {
                        order.push(key);
                    }
                    group.push(entry);
                }

                for key in order {
                    let group = groups.remove(&key).unwrap_or_default();
                    if let [entry] = group.as_slice() {
                        let v = OperatorValue {
                            tree,
                            entry: *entry,
                            options: self.options,
                        };
                        map.serialize_entry(&key, &v)?;
                    } else {
                        let v = Elements {
                            tree,
                            entries: group,
                            options: self.options,
                        };
                        map.serialize_entry(&key, &v)?;
                    }
                }
            }
        }

        // Bare elements mixed in with keyed fields
        if !elements.is_empty() {
            let trailer = Elements {
                tree,
                entries: elements,
                options: self.options,
            };
            map.serialize_entry("trailer", &trailer)?;
        }

        map.end()
    }
}
