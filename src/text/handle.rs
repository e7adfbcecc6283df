use super::{Entry, EntryId, Key, ObjectId, Operator, Tree, Value};
use crate::{Error, ErrorKind};

/// Something an entry key can be matched against, and created from
pub trait KeyPattern {
    fn matches(&self, key: &Key) -> bool;
    fn to_key(&self) -> Key;
}

impl KeyPattern for &str {
    fn matches(&self, key: &Key) -> bool {
        key.as_text() == Some(*self)
    }

    fn to_key(&self) -> Key {
        Key::Text((*self).to_owned())
    }
}

impl KeyPattern for String {
    fn matches(&self, key: &Key) -> bool {
        key.as_text() == Some(self.as_str())
    }

    fn to_key(&self) -> Key {
        Key::Text(self.clone())
    }
}

impl KeyPattern for &Key {
    fn matches(&self, key: &Key) -> bool {
        match (*self, key) {
            (Key::Number(a), Key::Number(b)) => a == b || a.to_f64() == b.to_f64(),
            (a, b) => a == b,
        }
    }

    fn to_key(&self) -> Key {
        (*self).clone()
    }
}

macro_rules! int_key_pattern {
    ($($t:ty),*) => {
        $(
            impl KeyPattern for $t {
                fn matches(&self, key: &Key) -> bool {
                    match key {
                        Key::Number(x) => x.to_i64() == Some(*self as i64),
                        _ => false,
                    }
                }

                fn to_key(&self) -> Key {
                    Key::Number(super::Number::from(*self))
                }
            }
        )*
    };
}

int_key_pattern!(u32, i32, i64, usize);

/// A view of an ordered entry list
///
/// `find` never modifies the tree, while `get` appends an absent entry when
/// nothing matches so that chained navigation into optional fields never
/// fails. Such an entry stays invisible in the output until a value is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(ObjectId);

impl ObjectHandle {
    pub fn new(id: ObjectId) -> Self {
        ObjectHandle(id)
    }

    pub fn id(self) -> ObjectId {
        self.0
    }

    /// Number of entries, counting absent ones
    pub fn len(self, tree: &Tree) -> usize {
        tree.object(self.0).len()
    }

    /// True when there is no present entry
    pub fn is_empty(self, tree: &Tree) -> bool {
        self.live_entries(tree).next().is_none()
    }

    /// Every entry in order
    pub fn entries(self, tree: &Tree) -> impl Iterator<Item = EntryHandle> + '_ {
        tree.object(self.0).iter().map(|&x| EntryHandle(x))
    }

    /// Every entry that has a value
    pub fn live_entries(self, tree: &Tree) -> impl Iterator<Item = EntryHandle> + '_ {
        self.entries(tree).filter(move |x| !x.value(tree).is_absent())
    }

    /// The first entry with the key
    pub fn find(self, tree: &Tree, key: impl KeyPattern) -> Option<EntryHandle> {
        self.entries(tree).find(|x| key.matches(x.key(tree)))
    }

    /// The first entry with the key, appending an absent one if none exists
    pub fn get(self, tree: &mut Tree, key: impl KeyPattern) -> EntryHandle {
        match self.find(tree, &key.to_key()) {
            Some(x) => x,
            None => EntryHandle(tree.push(self.0, Entry::new(key.to_key(), Value::Absent))),
        }
    }

    /// Every entry with the key
    pub fn get_all(self, tree: &Tree, key: impl KeyPattern) -> Vec<EntryHandle> {
        self.entries(tree)
            .filter(|x| key.matches(x.key(tree)))
            .collect()
    }

    /// Every entry accepted by the predicate
    pub fn filter<F>(self, tree: &Tree, mut predicate: F) -> Vec<EntryHandle>
    where
        F: FnMut(&Entry) -> bool,
    {
        self.entries(tree)
            .filter(|x| predicate(tree.entry(x.0)))
            .collect()
    }

    /// Position of the entry within this object
    pub fn position(self, tree: &Tree, entry: EntryHandle) -> Option<usize> {
        tree.object(self.0).iter().position(|&x| x == entry.0)
    }

    /// Appends a keyed entry
    pub fn push(self, tree: &mut Tree, key: impl KeyPattern, value: impl Into<Value>) -> EntryHandle {
        EntryHandle(tree.push(self.0, Entry::new(key.to_key(), value)))
    }

    /// Appends a keyless array element
    pub fn push_value(self, tree: &mut Tree, value: impl Into<Value>) -> EntryHandle {
        EntryHandle(tree.push(self.0, Entry::element(value)))
    }

    /// Appends a keyed entry holding a new empty object
    pub fn push_object(self, tree: &mut Tree, key: impl KeyPattern) -> ObjectHandle {
        let child = tree.new_object();
        tree.push(self.0, Entry::new(key.to_key(), child));
        ObjectHandle(child)
    }

    /// Appends a keyless element holding a new empty object
    pub fn push_element_object(self, tree: &mut Tree) -> ObjectHandle {
        let child = tree.new_object();
        tree.push(self.0, Entry::element(child));
        ObjectHandle(child)
    }

    /// Inserts an entry at a position
    pub fn insert(self, tree: &mut Tree, index: usize, entry: Entry) -> EntryHandle {
        EntryHandle(tree.insert(self.0, index, entry))
    }

    /// Unlinks the entry from this object. Returns false when it was not here
    pub fn remove_entry(self, tree: &mut Tree, entry: EntryHandle) -> bool {
        let list = tree.object_mut(self.0);
        match list.iter().position(|&x| x == entry.0) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Unlinks every entry with the key, returning how many were removed
    pub fn remove_all_by_key(self, tree: &mut Tree, key: impl KeyPattern) -> usize {
        let matching: Vec<EntryId> = self.get_all(tree, key).into_iter().map(|x| x.0).collect();
        tree.object_mut(self.0).retain(|x| !matching.contains(x));
        matching.len()
    }

    /// Unlinks every keyless element equal to the value. Returns true if any
    /// was removed
    pub fn remove_value(self, tree: &mut Tree, value: &Value) -> bool {
        let matching: Vec<EntryId> = self
            .filter(tree, |e| e.key.is_none() && &e.value == value)
            .into_iter()
            .map(|x| x.0)
            .collect();
        tree.object_mut(self.0).retain(|x| !matching.contains(x));
        !matching.is_empty()
    }

    /// The numeric values of the keyless elements, eg: `ships={ 1 2 3 }`
    pub fn ids(self, tree: &Tree) -> Vec<u32> {
        self.entries(tree)
            .filter(|x| x.key(tree).is_none())
            .filter_map(|x| x.value(tree).as_id())
            .collect()
    }

    /// Follows nested keys without creating anything
    pub fn find_path(self, tree: &Tree, path: &[&str]) -> Option<EntryHandle> {
        let (first, rest) = path.split_first()?;
        let entry = self.find(tree, *first)?;
        if rest.is_empty() {
            Some(entry)
        } else {
            entry.object(tree)?.find_path(tree, rest)
        }
    }

    /// Follows nested keys, creating objects along the way
    pub fn get_path(self, tree: &mut Tree, path: &[&str]) -> Result<EntryHandle, Error> {
        let mut object = self;
        let mut result = None;
        for (i, key) in path.iter().enumerate() {
            let entry = object.get(tree, *key);
            if i + 1 < path.len() {
                object = entry.value_as_object(tree)?;
            }
            result = Some(entry);
        }
        result.ok_or_else(|| {
            Error::invalid_state("invalid-state/unexpected-value", "empty path")
        })
    }
}

/// A view of a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(EntryId);

impl EntryHandle {
    pub fn new(id: EntryId) -> Self {
        EntryHandle(id)
    }

    pub fn id(self) -> EntryId {
        self.0
    }

    pub fn key(self, tree: &Tree) -> &Key {
        &tree.entry(self.0).key
    }

    pub fn set_key(self, tree: &mut Tree, key: impl Into<Key>) {
        tree.entry_mut(self.0).key = key.into();
    }

    pub fn value(self, tree: &Tree) -> &Value {
        &tree.entry(self.0).value
    }

    pub fn set_value(self, tree: &mut Tree, value: impl Into<Value>) {
        tree.entry_mut(self.0).value = value.into();
    }

    /// Replaces the value, returning the previous one
    pub fn replace_value(self, tree: &mut Tree, value: impl Into<Value>) -> Value {
        std::mem::replace(&mut tree.entry_mut(self.0).value, value.into())
    }

    pub fn operator(self, tree: &Tree) -> Operator {
        tree.entry(self.0).operator
    }

    pub fn set_operator(self, tree: &mut Tree, operator: Operator) {
        tree.entry_mut(self.0).operator = operator;
    }

    pub fn is_absent(self, tree: &Tree) -> bool {
        self.value(tree).is_absent()
    }

    /// The nested object, if the value is one
    pub fn object(self, tree: &Tree) -> Option<ObjectHandle> {
        self.value(tree).as_object().map(ObjectHandle)
    }

    /// Treats the value as an object. An absent value becomes a new empty
    /// object while any other primitive is an error.
    ///
    /// ```
    /// use stellaris_save::text::TreeParser;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut doc = TreeParser::new().parse("name = Sol")?;
    /// let root = doc.root();
    /// let flags = root.get(doc.tree_mut(), "flags");
    /// let flags = flags.value_as_object(doc.tree_mut())?;
    /// flags.push(doc.tree_mut(), "seen", 1u32);
    ///
    /// let name = root.get(doc.tree_mut(), "name");
    /// let err = name.value_as_object(doc.tree_mut()).unwrap_err();
    /// assert_eq!(err.code(), "invalid-state/unexpected-value");
    /// assert_eq!(doc.to_string(), "name=Sol\nflags={\n\tseen=1\n}\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn value_as_object(self, tree: &mut Tree) -> Result<ObjectHandle, Error> {
        match tree.entry(self.0).value {
            Value::Object(x) => Ok(ObjectHandle(x)),
            Value::Absent => {
                let object = tree.new_object();
                tree.entry_mut(self.0).value = Value::Object(object);
                Ok(ObjectHandle(object))
            }
            ref other => Err(Error::new(ErrorKind::InvalidState {
                code: "invalid-state/unexpected-value",
                msg: format!(
                    "expected an object under '{}' but found {:?}",
                    tree.entry(self.0).key,
                    other
                ),
            })),
        }
    }

    /// Looks up a key in the nested object without modifying anything
    pub fn find(self, tree: &Tree, key: impl KeyPattern) -> Option<EntryHandle> {
        self.object(tree)?.find(tree, key)
    }

    /// Looks up a key in the nested object, creating the object and the
    /// entry as needed
    pub fn get(self, tree: &mut Tree, key: impl KeyPattern) -> Result<EntryHandle, Error> {
        Ok(self.value_as_object(tree)?.get(tree, key))
    }

    /// Every nested entry with the key. Empty when the value is not an object
    pub fn get_all(self, tree: &Tree, key: impl KeyPattern) -> Vec<EntryHandle> {
        self.object(tree)
            .map(|x| x.get_all(tree, key))
            .unwrap_or_default()
    }

    /// Follows nested keys without creating anything
    pub fn find_path(self, tree: &Tree, path: &[&str]) -> Option<EntryHandle> {
        self.object(tree)?.find_path(tree, path)
    }

    /// Follows nested keys, creating objects along the way
    pub fn get_path(self, tree: &mut Tree, path: &[&str]) -> Result<EntryHandle, Error> {
        self.value_as_object(tree)?.get_path(tree, path)
    }

    /// The numeric keyless elements of the nested object
    pub fn ids(self, tree: &Tree) -> Vec<u32> {
        self.object(tree).map(|x| x.ids(tree)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Document, TreeParser};

    fn doc(data: &str) -> Document {
        TreeParser::new().parse(data).unwrap()
    }

    #[test]
    fn test_find_does_not_create() {
        let d = doc("a=1");
        assert!(d.root().find(d.tree(), "b").is_none());
        assert_eq!(d.root().len(d.tree()), 1);
    }

    #[test]
    fn test_get_creates_absent() {
        let mut d = doc("a=1");
        let root = d.root();
        let b = root.get(d.tree_mut(), "b");
        assert!(b.is_absent(d.tree()));
        assert_eq!(root.len(d.tree()), 2);
        assert_eq!(d.to_string(), "a=1\n");

        let again = root.get(d.tree_mut(), "b");
        assert_eq!(b, again);
        b.set_value(d.tree_mut(), 2u32);
        assert_eq!(d.to_string(), "a=1\nb=2\n");
    }

    #[test]
    fn test_numeric_keys() {
        let d = doc("0={ name=a } 17={ name=b }");
        let tree = d.tree();
        let entry = d.root().find(tree, 17u32).unwrap();
        assert_eq!(
            entry.find(tree, "name").unwrap().value(tree),
            &Value::word("b")
        );
        assert!(d.root().find(tree, "17").is_none());
    }

    #[test]
    fn test_get_all_repeated_keys() {
        let d = doc("nebula={ name=a } x=1 nebula={ name=b }");
        assert_eq!(d.root().get_all(d.tree(), "nebula").len(), 2);
        let filtered = d.root().filter(d.tree(), |e| e.value.as_id() == Some(1));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_aliasing_handles() {
        let mut d = doc("a={ b=1 }");
        let root = d.root();
        let first = root.find(d.tree(), "a").unwrap();
        let second = root.get(d.tree_mut(), "a");
        let b = first.get(d.tree_mut(), "b").unwrap();
        b.set_value(d.tree_mut(), 5u32);
        assert_eq!(
            second.find(d.tree(), "b").unwrap().value(d.tree()),
            &Value::from(5u32)
        );
    }

    #[test]
    fn test_remove_entries() {
        let mut d = doc("a=1 b=2 a=3 list={ 1 2 1 }");
        let root = d.root();
        assert_eq!(root.remove_all_by_key(d.tree_mut(), "a"), 2);
        let list = root.find(d.tree(), "list").unwrap().object(d.tree()).unwrap();
        assert!(list.remove_value(d.tree_mut(), &Value::from(1u32)));
        assert_eq!(list.ids(d.tree()), vec![2]);
        let b = root.find(d.tree(), "b").unwrap();
        assert!(root.remove_entry(d.tree_mut(), b));
        assert!(!root.remove_entry(d.tree_mut(), b));
        assert_eq!(d.to_string(), "list={\n\t2\n}\n");
    }

    #[test]
    fn test_paths() {
        let mut d = doc("movement_manager={ coordinate={ x=1 y=2 } }");
        let root = d.root();
        let x = root
            .find_path(d.tree(), &["movement_manager", "coordinate", "x"])
            .unwrap();
        assert_eq!(x.value(d.tree()).as_f64(), Some(1.0));

        let created = root.get_path(d.tree_mut(), &["combat", "in_combat_with"]).unwrap();
        created.value_as_object(d.tree_mut()).unwrap();
        assert!(root.find_path(d.tree(), &["combat", "in_combat_with"]).is_some());

        let err = root.get_path(d.tree_mut(), &["movement_manager", "coordinate", "x", "y"]);
        assert!(err.is_err());
    }
}
