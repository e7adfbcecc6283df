use super::{
    error::{ErrorPoint, ParseError, ParseErrorKind},
    Entry, Key, Number, ObjectId, Operator, Tree, Value,
};
use crate::data::{is_boundary, is_number_start, is_whitespace, is_word_start};
use crate::Error;
use std::fmt;

const PROGRESS_INTERVAL: usize = 64 * 1024;

/// Reads markup text into a [`Tree`]
///
/// ```
/// use stellaris_save::text::TreeParser;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let doc = TreeParser::new().parse("name = \"Sol\" flags = { a b }")?;
/// let name = doc.root().find(doc.tree(), "name").unwrap();
/// assert_eq!(name.value(doc.tree()).unquoted().as_deref(), Some("Sol"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct TreeParser<'a> {
    progress: Option<Box<dyn FnMut(usize, usize) + 'a>>,
}

impl fmt::Debug for TreeParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeParser")
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl<'a> TreeParser<'a> {
    pub fn new() -> Self {
        TreeParser { progress: None }
    }

    /// Registers a callback that periodically receives the scan offset and
    /// the total input length
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(usize, usize) + 'a,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Parses text into a standalone document
    pub fn parse(&mut self, text: &str) -> Result<super::Document, Error> {
        let mut tree = Tree::new();
        let root = self.parse_into(&mut tree, text)?;
        Ok(super::Document::from_parts(tree, root))
    }

    /// Parses text into a new root object of an existing tree
    pub fn parse_into(&mut self, tree: &mut Tree, text: &str) -> Result<ObjectId, Error> {
        let root = tree.new_object();
        let mut state = ParserState {
            text,
            data: text.as_bytes(),
            pos: 0,
            next_report: PROGRESS_INTERVAL,
            progress: self.progress.as_mut(),
        };
        state.run(tree, root)?;
        Ok(root)
    }
}

enum Piece {
    Scalar(Value),
    Open(usize),
}

struct ParserState<'t, 'p, 'a> {
    text: &'t str,
    data: &'t [u8],
    pos: usize,
    next_report: usize,
    progress: Option<&'p mut Box<dyn FnMut(usize, usize) + 'a>>,
}

impl ParserState<'_, '_, '_> {
    fn error(&self, kind: ParseErrorKind, offset: usize, comment: Option<&str>) -> Error {
        let point = ErrorPoint::locate(self.data, offset, comment);
        Error::from(ParseError::new(kind, vec![point]))
    }

    #[inline]
    fn report(&mut self) {
        if self.pos >= self.next_report {
            self.next_report = self.pos + PROGRESS_INTERVAL;
            if let Some(cb) = self.progress.as_mut() {
                cb(self.pos, self.data.len());
            }
        }
    }

    /// Advances past whitespace and line comments
    fn skip_filler(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'#' {
                self.pos = self.data[self.pos..]
                    .iter()
                    .position(|&x| x == b'\n')
                    .map_or(self.data.len(), |x| self.pos + x + 1);
            } else {
                break;
            }
        }
    }

    fn peek_operator(&self) -> Option<(Operator, usize)> {
        Operator::from_prefix(&self.data[self.pos..])
    }

    fn read_piece(&mut self) -> Result<Piece, Error> {
        let start = self.pos;
        let b = self.data[start];
        if b == b'"' {
            let mut i = start + 1;
            loop {
                match self.data.get(i) {
                    Some(b'\\') => i += 2,
                    Some(b'"') => break,
                    Some(_) => i += 1,
                    None => {
                        return Err(self.error(
                            ParseErrorKind::StringNotClosed,
                            start,
                            Some("string start"),
                        ))
                    }
                }
            }
            self.pos = i + 1;
            Ok(Piece::Scalar(Value::Text(self.text[start..self.pos].to_owned())))
        } else if b == b'{' {
            self.pos += 1;
            Ok(Piece::Open(start))
        } else if is_word_start(b) || is_number_start(b) {
            let end = self.data[start..]
                .iter()
                .position(|&x| is_boundary(x))
                .map_or(self.data.len(), |x| start + x);
            self.pos = end;
            let raw = &self.text[start..end];
            if is_number_start(b) {
                Ok(Piece::Scalar(Value::Number(Number::from_literal(raw))))
            } else {
                Ok(Piece::Scalar(Value::Text(raw.to_owned())))
            }
        } else {
            Err(self.error(ParseErrorKind::UnexpectedSymbol(b), start, None))
        }
    }

    fn run(&mut self, tree: &mut Tree, root: ObjectId) -> Result<(), Error> {
        // objects being filled, with the offset of their opening brace
        let mut stack: Vec<(ObjectId, usize)> = Vec::new();
        let mut current = root;

        loop {
            self.report();
            self.skip_filler();
            let b = match self.data.get(self.pos) {
                Some(&b) => b,
                None => {
                    if let Some(&(_, open)) = stack.last() {
                        return Err(self.error(
                            ParseErrorKind::ObjectNotClosed,
                            open,
                            Some("object start"),
                        ));
                    }
                    break;
                }
            };

            if b == b'}' {
                let (_, open) = match stack.pop() {
                    Some(x) => x,
                    None => {
                        return Err(self.error(ParseErrorKind::UnexpectedSymbol(b), self.pos, None))
                    }
                };
                self.pos += 1;
                let closed = current;
                current = stack.last().map_or(root, |x| x.0);

                // a keyless object directly followed by an operator was meant as a key
                let was_element = tree
                    .object(current)
                    .last()
                    .map(|&x| tree.entry(x))
                    .map_or(false, |x| x.key.is_none() && x.value == Value::Object(closed));
                if was_element {
                    self.skip_filler();
                    if self.peek_operator().is_some() {
                        return Err(self.error(
                            ParseErrorKind::ArrayAsKey,
                            open,
                            Some("object start"),
                        ));
                    }
                }
                continue;
            }

            let key = if b == b'=' {
                // malformed `= value` lines, read as an empty key
                Value::Text(String::new())
            } else {
                match self.read_piece()? {
                    Piece::Scalar(x) => x,
                    Piece::Open(open) => {
                        let child = tree.new_object();
                        tree.push(current, Entry::element(child));
                        stack.push((child, open));
                        current = child;
                        continue;
                    }
                }
            };

            self.skip_filler();
            let (operator, len) = match self.peek_operator() {
                Some(x) => x,
                None => {
                    tree.push(current, Entry::element(key));
                    continue;
                }
            };

            self.pos += len;
            self.skip_filler();

            let key = match key {
                Value::Number(x) => Key::Number(x),
                Value::Text(x) => Key::Text(x),
                _ => Key::None,
            };

            // `key=` right before a closing brace or the end of input is kept
            // as an absent entry, which is never written back
            if self.data.get(self.pos).map_or(true, |&x| x == b'}') {
                tree.push(
                    current,
                    Entry {
                        key,
                        operator,
                        value: Value::Absent,
                    },
                );
                continue;
            }

            match self.read_piece()? {
                Piece::Scalar(value) => {
                    tree.push(
                        current,
                        Entry {
                            key,
                            operator,
                            value,
                        },
                    );
                }
                Piece::Open(open) => {
                    let child = tree.new_object();
                    tree.push(
                        current,
                        Entry {
                            key,
                            operator,
                            value: Value::Object(child),
                        },
                    );
                    stack.push((child, open));
                    current = child;
                }
            }
        }

        if let Some(cb) = self.progress.as_mut() {
            cb(self.data.len(), self.data.len());
        }

        Ok(())
    }
}
