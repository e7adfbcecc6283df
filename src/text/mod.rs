//! The generic tree codec for the Paradox key/value markup
//!
//! Text is parsed into a [`Tree`] arena where every entry and every object
//! is addressed by index. [`ObjectHandle`] and [`EntryHandle`] are copyable
//! views into that arena: they never own data, so two handles over the same
//! entry always agree, and whatever is edited through them is what the
//! [`TreeWriter`] writes back out.
//!
//! ```
//! use stellaris_save::text::Document;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = "name=\"Sol\"\ncoordinate={\n\tx=1\n\ty=2\n}\n";
//! let mut doc = Document::parse(data)?;
//! assert_eq!(doc.to_string(), data);
//!
//! let root = doc.root();
//! let x = root.get_path(doc.tree_mut(), &["coordinate", "x"])?;
//! x.set_value(doc.tree_mut(), 10u32);
//! assert_eq!(doc.to_string(), "name=\"Sol\"\ncoordinate={\n\tx=10\n\ty=2\n}\n");
//! # Ok(())
//! # }
//! ```
mod document;
mod error;
mod handle;
mod operator;
mod parser;
mod tree;
mod value;
mod writer;

pub use self::document::Document;
pub use self::error::{line_and_column, ErrorPoint, ParseError, ParseErrorKind};
pub use self::handle::{EntryHandle, KeyPattern, ObjectHandle};
pub use self::operator::*;
pub use self::parser::TreeParser;
pub use self::tree::{Entry, EntryId, ObjectId, Tree};
pub use self::value::{Key, Number, Value};
#[cfg(feature = "json")]
pub(crate) use self::value::unquote;
pub use self::writer::{to_string, TreeWriter, TreeWriterBuilder};
