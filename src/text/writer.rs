use super::{Key, ObjectId, Tree, Value};
use crate::Error;
use std::io::Write;

/// Writes a [`Tree`] object back out as markup.
///
/// Instantiated via `TreeWriterBuilder`. Entries are written in their stored
/// order, absent values are skipped, and every nested object is indented one
/// level deeper than its parent.
#[derive(Debug)]
pub struct TreeWriter<W> {
    writer: W,
    indent_char: u8,
    indent_factor: u8,
    indent: Vec<u8>,
}

/// Construct a customized tree writer
///
/// ```
/// use stellaris_save::text::{TreeParser, TreeWriterBuilder};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let doc = TreeParser::new().parse("a = { b = c }")?;
/// let mut out: Vec<u8> = Vec::new();
/// let mut writer = TreeWriterBuilder::new()
///     .indent_char(b' ')
///     .indent_factor(2)
///     .from_writer(&mut out);
/// writer.write_object(doc.tree(), doc.root().id())?;
/// assert_eq!(std::str::from_utf8(&out)?, "a={\n  b=c\n}\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TreeWriterBuilder {
    indent_char: u8,
    indent_factor: u8,
}

impl<W> TreeWriter<W>
where
    W: Write,
{
    /// Get inner writer, keeping ownership
    pub fn inner(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes this Writer, returning the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_indent(&mut self, depth: usize) -> Result<(), Error> {
        let width = depth * usize::from(self.indent_factor);
        if self.indent.len() < width {
            self.indent.resize(width, self.indent_char);
        }
        self.writer.write_all(&self.indent[..width])?;
        Ok(())
    }

    fn write_scalar(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::Text(x) => self.writer.write_all(x.as_bytes())?,
            Value::Number(x) => self.writer.write_all(x.as_str().as_bytes())?,
            Value::Absent | Value::Object(_) => {}
        }
        Ok(())
    }

    /// Write every entry of an object at the root level (no braces around it)
    pub fn write_object(&mut self, tree: &Tree, object: ObjectId) -> Result<(), Error> {
        // objects being written and the position of their next entry
        let mut stack: Vec<(ObjectId, usize)> = vec![(object, 0)];
        while let Some(&(current, index)) = stack.last() {
            let children = tree.object(current);
            let depth = stack.len() - 1;
            if index >= children.len() {
                stack.pop();
                if depth > 0 {
                    self.write_indent(depth - 1)?;
                    self.writer.write_all(b"}\n")?;
                }
                continue;
            }

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let entry = tree.entry(children[index]);
            if entry.value.is_absent() {
                continue;
            }

            self.write_indent(depth)?;
            match &entry.key {
                Key::None => {}
                Key::Text(x) => self.writer.write_all(x.as_bytes())?,
                Key::Number(x) => self.writer.write_all(x.as_str().as_bytes())?,
            }

            if !entry.key.is_none() {
                self.writer.write_all(entry.operator.symbol().as_bytes())?;
            }

            match entry.value {
                Value::Object(child) => {
                    self.writer.write_all(b"{\n")?;
                    stack.push((child, 0));
                }
                ref scalar => {
                    self.write_scalar(scalar)?;
                    self.writer.write_all(b"\n")?;
                }
            }
        }

        Ok(())
    }
}

impl TreeWriterBuilder {
    /// Construct a new TreeWriterBuilder with default values
    pub fn new() -> TreeWriterBuilder {
        TreeWriterBuilder::default()
    }

    /// The character to indent line.
    ///
    /// The default is a tab, which is what the game writes.
    pub fn indent_char(&mut self, indent_char: u8) -> &mut TreeWriterBuilder {
        self.indent_char = indent_char;
        self
    }

    /// The number of indents per increased depth
    ///
    /// The default is 1
    pub fn indent_factor(&mut self, indent_factor: u8) -> &mut TreeWriterBuilder {
        self.indent_factor = indent_factor;
        self
    }

    /// Construct a tree writer from a builder and a writer.
    pub fn from_writer<R>(&self, writer: R) -> TreeWriter<R>
    where
        R: Write,
    {
        TreeWriter {
            writer,
            indent_char: self.indent_char,
            indent_factor: self.indent_factor,
            indent: Vec::new(),
        }
    }
}

impl Default for TreeWriterBuilder {
    fn default() -> Self {
        TreeWriterBuilder {
            indent_char: b'\t',
            indent_factor: 1,
        }
    }
}

/// Serializes an object with the default formatting
pub fn to_string(tree: &Tree, object: ObjectId) -> String {
    let mut out: Vec<u8> = Vec::new();
    let mut writer = TreeWriterBuilder::new().from_writer(&mut out);

    // writing into a vec can not fail
    let _ = writer.write_object(tree, object);
    match String::from_utf8(out) {
        Ok(x) => x,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
