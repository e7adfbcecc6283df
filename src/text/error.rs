use std::{fmt, path::PathBuf};

/// The structural problem found in the markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A quoted string has no closing quote
    StringNotClosed,

    /// An object has no closing brace
    ObjectNotClosed,

    /// A byte that can not start a key, value, or operator
    UnexpectedSymbol(u8),

    /// An object appeared where a key was expected
    ArrayAsKey,
}

impl ParseErrorKind {
    /// The error code used to tag this problem
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::StringNotClosed => "parser/string-not-closed",
            ParseErrorKind::ObjectNotClosed => "parser/object-not-closed",
            ParseErrorKind::UnexpectedSymbol(_) => "parser/unexpected-symbol",
            ParseErrorKind::ArrayAsKey => "parser/array-as-key",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::StringNotClosed => f.write_str("string not closed"),
            ParseErrorKind::ObjectNotClosed => f.write_str("object not closed"),
            ParseErrorKind::UnexpectedSymbol(b) if b.is_ascii_graphic() => {
                write!(f, "unexpected symbol '{}'", *b as char)
            }
            ParseErrorKind::UnexpectedSymbol(b) => write!(f, "unexpected byte 0x{:02x}", b),
            ParseErrorKind::ArrayAsKey => f.write_str("object used as a key"),
        }
    }
}

/// A location in the source relevant to a parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPoint {
    /// Byte offset into the source
    pub offset: usize,

    /// 1-based line
    pub line: usize,

    /// 1-based column, counted in bytes
    pub column: usize,

    /// What happened here
    pub comment: Option<String>,
}

impl ErrorPoint {
    pub(crate) fn locate(data: &[u8], offset: usize, comment: Option<&str>) -> Self {
        let (line, column) = line_and_column(data, offset);
        ErrorPoint {
            offset,
            line,
            column,
            comment: comment.map(String::from),
        }
    }
}

/// Computes the 1-based line and column of an offset
pub fn line_and_column(data: &[u8], offset: usize) -> (usize, usize) {
    let offset = offset.min(data.len());
    let before = &data[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |x| x + 1);
    (line, offset - line_start + 1)
}

/// Malformed markup, with the locations that explain it
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    kind: ParseErrorKind,
    points: Vec<ErrorPoint>,
    path: Option<PathBuf>,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, points: Vec<ErrorPoint>) -> Self {
        debug_assert!(!points.is_empty());
        ParseError {
            kind,
            points,
            path: None,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Offset of the primary error point
    pub fn offset(&self) -> usize {
        self.points.first().map_or(0, |x| x.offset)
    }

    pub fn points(&self) -> &[ErrorPoint] {
        &self.points
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Attaches the file the source was read from
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Renders the source lines around every error point, with a caret under
    /// the offending column
    ///
    /// ```
    /// use stellaris_save::text::{TreeParser, ParseError};
    /// use stellaris_save::ErrorKind;
    /// let data = "a = 1\nb = { c = 2\n";
    /// let err = TreeParser::new().parse(data).unwrap_err();
    /// let ErrorKind::Parse(err) = err.into_kind() else { panic!() };
    /// let excerpt = err.excerpt(data);
    /// assert!(excerpt.contains("2 | b = { c = 2"));
    /// assert!(excerpt.contains("^ object start"));
    /// ```
    pub fn excerpt(&self, source: &str) -> String {
        const CONTEXT: usize = 1;
        let lines: Vec<&str> = source.split('\n').collect();
        let width = (lines.len()).to_string().len();
        let mut out = String::new();
        for point in &self.points {
            let first = point.line.saturating_sub(CONTEXT).max(1);
            let last = (point.line + CONTEXT).min(lines.len());
            for number in first..=last {
                let text = lines[number - 1].trim_end_matches('\r');
                out.push_str(&format!("{:>width$} | {}\n", number, text, width = width));
                if number == point.line {
                    out.push_str(&format!(
                        "{:>width$} | {}^",
                        "",
                        " ".repeat(point.column - 1),
                        width = width
                    ));
                    if let Some(comment) = &point.comment {
                        out.push(' ');
                        out.push_str(comment);
                    }
                    out.push('\n');
                }
            }
        }
        out
    }
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for point in &self.points {
            f.write_str("\n  at ")?;
            if let Some(path) = &self.path {
                write!(f, "{}:", path.display())?;
            }
            write!(f, "{}:{} (offset {})", point.line, point.column, point.offset)?;
            if let Some(comment) = &point.comment {
                write!(f, " {}", comment)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(b"abc", 0, (1, 1))]
    #[case(b"abc", 2, (1, 3))]
    #[case(b"a\nbc", 2, (2, 1))]
    #[case(b"a\nbc", 3, (2, 2))]
    #[case(b"a\n\n", 3, (3, 1))]
    fn test_line_and_column(
        #[case] data: &[u8],
        #[case] offset: usize,
        #[case] expected: (usize, usize),
    ) {
        assert_eq!(line_and_column(data, offset), expected);
    }

    #[test]
    fn test_display_with_path() {
        let data = b"x = \"abc";
        let err = ParseError::new(
            ParseErrorKind::StringNotClosed,
            vec![ErrorPoint::locate(data, 4, Some("string start"))],
        )
        .with_path("gamestate");
        assert_eq!(
            err.to_string(),
            "string not closed\n  at gamestate:1:5 (offset 4) string start"
        );
    }
}
