use super::{writer, ObjectHandle, ObjectId, Tree, TreeParser};
use crate::Error;
use std::fmt;

/// A parsed standalone document: a tree and its root object
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree,
    root: ObjectHandle,
}

impl Document {
    pub(crate) fn from_parts(tree: Tree, root: ObjectId) -> Self {
        Document {
            tree,
            root: ObjectHandle::new(root),
        }
    }

    /// Parses a document with the default parser
    pub fn parse(text: &str) -> Result<Document, Error> {
        TreeParser::new().parse(text)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> ObjectHandle {
        self.root
    }

    /// Splits the document into its tree and root
    pub fn into_parts(self) -> (Tree, ObjectHandle) {
        (self.tree, self.root)
    }

    /// Structural equality (absent entries and formatting are ignored)
    pub fn same_content(&self, other: &Document) -> bool {
        self.tree
            .object_eq(self.root.id(), &other.tree, other.root.id())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&writer::to_string(&self.tree, self.root.id()))
    }
}
