use std::fmt::Display;

/// The separator between a key and its value
///
/// Everything but [`Operator::Equal`] is rare in save files, but all of them
/// are kept as written so that a parsed document writes back unchanged.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default)]
pub enum Operator {
    /// A `=` token
    #[default]
    Equal,

    /// A `==` token
    Exact,

    /// A `!=` token
    NotEqual,

    /// A `<` token
    LessThan,

    /// A `<=` token
    LessThanEqual,

    /// A `>` token
    GreaterThan,

    /// A `>=` token
    GreaterThanEqual,
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Operator {
    /// Returns the operator as it appears in the markup
    ///
    /// ```
    /// use stellaris_save::text::Operator;
    /// assert_eq!(Operator::Equal.symbol(), "=");
    /// assert_eq!(Operator::Exact.symbol(), "==");
    /// assert_eq!(Operator::NotEqual.symbol(), "!=");
    /// assert_eq!(Operator::LessThan.symbol(), "<");
    /// assert_eq!(Operator::LessThanEqual.symbol(), "<=");
    /// assert_eq!(Operator::GreaterThan.symbol(), ">");
    /// assert_eq!(Operator::GreaterThanEqual.symbol(), ">=");
    /// ```
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Exact => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEqual => ">=",
        }
    }

    /// Returns the name of the operator using only letters
    ///
    /// ```
    /// use stellaris_save::text::Operator;
    /// assert_eq!(Operator::Equal.name(), "EQUAL");
    /// assert_eq!(Operator::NotEqual.name(), "NOT_EQUAL");
    /// assert_eq!(Operator::GreaterThanEqual.name(), "GREATER_THAN_EQUAL");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equal => "EQUAL",
            Operator::Exact => "EXACT",
            Operator::NotEqual => "NOT_EQUAL",
            Operator::LessThan => "LESS_THAN",
            Operator::LessThanEqual => "LESS_THAN_EQUAL",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::GreaterThanEqual => "GREATER_THAN_EQUAL",
        }
    }

    /// Recognizes an operator at the start of the given bytes, returning it
    /// along with how many bytes it spans
    ///
    /// ```
    /// use stellaris_save::text::Operator;
    /// assert_eq!(Operator::from_prefix(b">= 3"), Some((Operator::GreaterThanEqual, 2)));
    /// assert_eq!(Operator::from_prefix(b"> 3"), Some((Operator::GreaterThan, 1)));
    /// assert_eq!(Operator::from_prefix(b"=="), Some((Operator::Exact, 2)));
    /// assert_eq!(Operator::from_prefix(b"!3"), None);
    /// ```
    pub fn from_prefix(data: &[u8]) -> Option<(Operator, usize)> {
        let first = *data.first()?;
        if !crate::data::is_operator(first) {
            return None;
        }

        let second_eq = data.get(1) == Some(&b'=');
        match (first, second_eq) {
            (b'=', true) => Some((Operator::Exact, 2)),
            (b'=', false) => Some((Operator::Equal, 1)),
            (b'!', true) => Some((Operator::NotEqual, 2)),
            (b'<', true) => Some((Operator::LessThanEqual, 2)),
            (b'<', false) => Some((Operator::LessThan, 1)),
            (b'>', true) => Some((Operator::GreaterThanEqual, 2)),
            (b'>', false) => Some((Operator::GreaterThan, 1)),
            _ => None,
        }
    }
}
