use super::{Key, Operator, Value};

/// Index of an entry inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u32);

/// Index of an object (ordered entry list) inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl EntryId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl ObjectId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The atomic unit of a document: a key, an operator, and a value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entry {
    pub key: Key,
    pub operator: Operator,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Entry {
            key: key.into(),
            operator: Operator::Equal,
            value: value.into(),
        }
    }

    /// A keyless array element
    pub fn element(value: impl Into<Value>) -> Self {
        Entry {
            key: Key::None,
            operator: Operator::Equal,
            value: value.into(),
        }
    }
}

/// Arena holding every entry and object of one or more documents
///
/// Entries and objects are never freed: removing an entry only unlinks it
/// from its parent object, and deleting a value sets it to
/// [`Value::Absent`]. Handles are plain indices, so any number of them may
/// alias the same entry and observe each other's edits.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    entries: Vec<Entry>,
    objects: Vec<Vec<EntryId>>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Allocates a new empty object
    pub fn new_object(&mut self) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Vec::new());
        id
    }

    /// Allocates an entry without linking it into any object
    pub(crate) fn alloc_entry(&mut self, entry: Entry) -> EntryId {
        let id = EntryId(self.entries.len() as u32);
        self.entries.push(entry);
        id
    }

    /// Appends an entry to the object
    pub fn push(&mut self, object: ObjectId, entry: Entry) -> EntryId {
        let id = self.alloc_entry(entry);
        self.objects[object.index()].push(id);
        id
    }

    /// Inserts an entry into the object at the given position (clamped to
    /// the object's length)
    pub fn insert(&mut self, object: ObjectId, index: usize, entry: Entry) -> EntryId {
        let id = self.alloc_entry(entry);
        let list = &mut self.objects[object.index()];
        let index = index.min(list.len());
        list.insert(index, id);
        id
    }

    #[inline]
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.index()]
    }

    #[inline]
    pub fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        &mut self.entries[id.index()]
    }

    #[inline]
    pub fn object(&self, id: ObjectId) -> &[EntryId] {
        &self.objects[id.index()]
    }

    #[inline]
    pub fn object_mut(&mut self, id: ObjectId) -> &mut Vec<EntryId> {
        &mut self.objects[id.index()]
    }

    /// Number of entries allocated in the arena (including unlinked ones)
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Copies a value so that the copy shares no object with the original
    pub fn deep_copy(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(id) => Value::Object(self.copy_object(*id)),
            x => x.clone(),
        }
    }

    /// Copies an object and everything nested in it
    pub fn copy_object(&mut self, source: ObjectId) -> ObjectId {
        let target = self.new_object();
        let children = self.object(source).to_vec();
        for child in children {
            let entry = self.entry(child).clone();
            let value = self.deep_copy(&entry.value);
            self.push(
                target,
                Entry {
                    key: entry.key,
                    operator: entry.operator,
                    value,
                },
            );
        }
        target
    }

    /// Copies a value that lives in another tree into this one
    pub fn import(&mut self, other: &Tree, value: &Value) -> Value {
        match value {
            Value::Object(id) => Value::Object(self.import_object(other, *id)),
            x => x.clone(),
        }
    }

    fn import_object(&mut self, other: &Tree, source: ObjectId) -> ObjectId {
        let target = self.new_object();
        for &child in other.object(source) {
            let entry = other.entry(child);
            let value = self.import(other, &entry.value);
            self.push(
                target,
                Entry {
                    key: entry.key.clone(),
                    operator: entry.operator,
                    value,
                },
            );
        }
        target
    }

    /// Structural equality of two objects, possibly from different trees.
    /// Absent entries are ignored as they are never written out.
    pub fn object_eq(&self, a: ObjectId, other: &Tree, b: ObjectId) -> bool {
        let left = self
            .object(a)
            .iter()
            .map(|&x| self.entry(x))
            .filter(|x| !x.value.is_absent());
        let mut right = other
            .object(b)
            .iter()
            .map(|&x| other.entry(x))
            .filter(|x| !x.value.is_absent());

        for l in left {
            let r = match right.next() {
                Some(r) => r,
                None => return false,
            };

            if l.key != r.key || l.operator != r.operator {
                return false;
            }

            let same = match (&l.value, &r.value) {
                (Value::Object(x), Value::Object(y)) => self.object_eq(*x, other, *y),
                (x, y) => x == y,
            };

            if !same {
                return false;
            }
        }

        right.next().is_none()
    }
}
