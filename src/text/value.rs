use super::tree::ObjectId;
use std::fmt;

/// A numeric literal exactly as it was written
///
/// The literal is kept verbatim so that `1.000` or `-0` survive a round
/// trip. Conversions are lossy views over that text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    /// Wraps a literal that was read from markup
    pub fn from_literal(literal: impl Into<String>) -> Self {
        Number(literal.into())
    }

    /// The literal as written
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The literal as a float. Malformed literals (eg: `1.2.3` dates) yield
    /// the longest parsable prefix like a javascript `parseFloat`
    ///
    /// ```
    /// use stellaris_save::text::Number;
    /// assert_eq!(Number::from_literal("-10.5").to_f64(), Some(-10.5));
    /// assert_eq!(Number::from_literal("2200.01.01").to_f64(), Some(2200.01));
    /// assert_eq!(Number::from_literal("-").to_f64(), None);
    /// ```
    pub fn to_f64(&self) -> Option<f64> {
        if let Ok(x) = self.0.parse::<f64>() {
            return Some(x);
        }

        let bytes = self.0.as_bytes();
        let mut end = 0;
        let mut seen_dot = false;
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'-' | b'+' if i == 0 => {}
                b'0'..=b'9' => end = i + 1,
                b'.' if !seen_dot => seen_dot = true,
                _ => break,
            }
        }

        self.0[..end].parse::<f64>().ok()
    }

    /// The literal as an integer when it holds a whole number
    ///
    /// ```
    /// use stellaris_save::text::Number;
    /// assert_eq!(Number::from_literal("4294967295").to_i64(), Some(4294967295));
    /// assert_eq!(Number::from_literal("10.000").to_i64(), Some(10));
    /// assert_eq!(Number::from_literal("10.5").to_i64(), None);
    /// ```
    pub fn to_i64(&self) -> Option<i64> {
        if let Ok(x) = self.0.parse::<i64>() {
            return Some(x);
        }

        let x = self.to_f64()?;
        if x.fract() == 0.0 && x.abs() < 9.007_199_254_740_992e15 {
            Some(x as i64)
        } else {
            None
        }
    }

    /// The literal as an entity id
    pub fn to_u32(&self) -> Option<u32> {
        self.to_i64().and_then(|x| u32::try_from(x).ok())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(x: $t) -> Self {
                    #[cfg(feature = "faster_writer")]
                    {
                        let mut buffer = itoa::Buffer::new();
                        Number(buffer.format(x).to_owned())
                    }

                    #[cfg(not(feature = "faster_writer"))]
                    {
                        Number(x.to_string())
                    }
                }
            }
        )*
    };
}

number_from_int!(i32, i64, u32, u64, usize);

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        if x.fract() == 0.0 && x.abs() < 9.007_199_254_740_992e15 {
            Number::from(x as i64)
        } else {
            Number(format!("{}", x))
        }
    }
}

/// The left hand side of an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Key {
    /// A bare array element without a key
    #[default]
    None,

    /// A textual key. An empty string is produced by the malformed `= value`
    /// form that sometimes appears in save files
    Text(String),

    /// A numeric key, typically an entity id
    Number(Number),
}

impl Key {
    /// Returns the key text, if the key is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Key::Text(x) => Some(x.as_str()),
            _ => None,
        }
    }

    /// Returns the key as an entity id, if the key is numeric
    pub fn as_id(&self) -> Option<u32> {
        match self {
            Key::Number(x) => x.to_u32(),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Key::None)
    }
}

impl From<&str> for Key {
    fn from(x: &str) -> Self {
        Key::Text(x.to_owned())
    }
}

impl From<String> for Key {
    fn from(x: String) -> Self {
        Key::Text(x)
    }
}

impl From<u32> for Key {
    fn from(x: u32) -> Self {
        Key::Number(Number::from(x))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::None => Ok(()),
            Key::Text(x) => f.write_str(x),
            Key::Number(x) => x.fmt(f),
        }
    }
}

/// The right hand side of an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// Not present. Entries with an absent value are skipped when written
    /// out, which is how entries are deleted
    #[default]
    Absent,

    /// A bare word (`yes`, `@var`) or a quoted string kept with its quotes
    Text(String),

    /// A numeric literal
    Number(Number),

    /// A nested object living in the same tree
    Object(ObjectId),
}

impl Value {
    /// Creates a quoted text value
    ///
    /// ```
    /// use stellaris_save::text::Value;
    /// assert_eq!(Value::quoted("Sol"), Value::Text(String::from("\"Sol\"")));
    /// ```
    pub fn quoted(x: &str) -> Self {
        let mut result = String::with_capacity(x.len() + 2);
        result.push('"');
        for c in x.chars() {
            if c == '"' {
                result.push('\\');
            }
            result.push(c);
        }
        result.push('"');
        Value::Text(result)
    }

    /// Creates a bare word value
    pub fn word(x: &str) -> Self {
        Value::Text(x.to_owned())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// The raw text of a word or quoted string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(x) => Some(x.as_str()),
            _ => None,
        }
    }

    /// The text with surrounding quotes stripped and escaped quotes restored
    ///
    /// ```
    /// use stellaris_save::text::Value;
    /// assert_eq!(Value::quoted("Sol").unquoted().as_deref(), Some("Sol"));
    /// assert_eq!(Value::word("yes").unquoted().as_deref(), Some("yes"));
    /// ```
    pub fn unquoted(&self) -> Option<String> {
        match self {
            Value::Text(x) => Some(unquote(x)),
            Value::Number(x) => Some(x.as_str().to_owned()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().and_then(|x| x.to_f64())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(|x| x.to_i64())
    }

    /// The value as an entity id
    pub fn as_id(&self) -> Option<u32> {
        self.as_number().and_then(|x| x.to_u32())
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(x) => Some(*x),
            _ => None,
        }
    }

    /// `yes` is true, `no` is false, anything else has no boolean meaning
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_text() {
            Some("yes") => Some(true),
            Some("no") => Some(false),
            _ => None,
        }
    }
}

pub(crate) fn unquote(x: &str) -> String {
    let inner = x
        .strip_prefix('"')
        .and_then(|x| x.strip_suffix('"'))
        .unwrap_or(x);

    if !inner.contains('\\') {
        return inner.to_owned();
    }

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

impl From<Number> for Value {
    fn from(x: Number) -> Self {
        Value::Number(x)
    }
}

impl From<ObjectId> for Value {
    fn from(x: ObjectId) -> Self {
        Value::Object(x)
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::word(if x { "yes" } else { "no" })
    }
}

macro_rules! value_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::Number(Number::from(x))
                }
            }
        )*
    };
}

value_from_number!(i32, i64, u32, u64, usize, f64);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(x: Option<T>) -> Self {
        x.map_or(Value::Absent, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("0", Some(0))]
    #[case("-5", Some(-5))]
    #[case("4294967295", Some(4294967295))]
    #[case("1.0", Some(1))]
    #[case("1.5", None)]
    #[case("abc", None)]
    fn test_number_to_i64(#[case] input: &str, #[case] expected: Option<i64>) {
        assert_eq!(Number::from_literal(input).to_i64(), expected);
    }

    #[test]
    fn test_number_from_float() {
        assert_eq!(Number::from(300.0).as_str(), "300");
        assert_eq!(Number::from(0.25).as_str(), "0.25");
        assert_eq!(Number::from(-12.5).as_str(), "-12.5");
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""a \"b\" c""#), r#"a "b" c"#);
        assert_eq!(unquote(r#""back\\slash""#), r#"back\\slash"#);
        assert_eq!(unquote("bare"), "bare");
    }

    #[test]
    fn test_quoted_escapes() {
        let value = Value::quoted(r#"say "hi""#);
        assert_eq!(value.as_text(), Some(r#""say \"hi\"""#));
        assert_eq!(value.unquoted().as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<u32>), Value::Absent);
        assert_eq!(Value::from(Some(5u32)), Value::Number(Number::from(5u32)));
    }

    #[test]
    fn test_bool_values() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::word("no").as_bool(), Some(false));
        assert_eq!(Value::quoted("yes").as_bool(), None);
    }
}
