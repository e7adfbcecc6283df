use crate::text::ParseError;
use std::{borrow::Cow, fmt};

/// An error that can occur when reading, navigating, or editing a save
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    pub(crate) fn not_found(entity: EntityKind, key: impl fmt::Display) -> Error {
        Error::new(ErrorKind::NotFound {
            entity,
            key: key.to_string(),
        })
    }

    pub(crate) fn game_data(code: &'static str, msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::GameData {
            code,
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_state(code: &'static str, msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::InvalidState {
            code,
            msg: msg.into(),
        })
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Consume the error and return the specific type of error
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns the byte offset that the error occurs (if available)
    pub fn offset(&self) -> Option<usize> {
        self.0.offset()
    }

    /// The tag that classifies the error, eg: `parser/string-not-closed` or
    /// `system-not-found`
    ///
    /// ```
    /// use stellaris_save::text::TreeParser;
    /// let err = TreeParser::new().parse("foo = \"bar").unwrap_err();
    /// assert_eq!(err.code(), "parser/string-not-closed");
    /// ```
    pub fn code(&self) -> Cow<'static, str> {
        self.0.code()
    }
}

/// The kind of entity a lookup was searching for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    System,
    Nebula,
    Planet,
    Country,
    Fleet,
    Ship,
    ShipDesign,
    FleetTemplate,
    Leader,
    Army,
    Sector,
    Species,
}

impl EntityKind {
    /// The kebab cased name used in error codes
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::System => "system",
            EntityKind::Nebula => "nebula",
            EntityKind::Planet => "planet",
            EntityKind::Country => "country",
            EntityKind::Fleet => "fleet",
            EntityKind::Ship => "ship",
            EntityKind::ShipDesign => "ship-design",
            EntityKind::FleetTemplate => "fleet-template",
            EntityKind::Leader => "leader",
            EntityKind::Army => "army",
            EntityKind::Sector => "sector",
            EntityKind::Species => "species",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum ErrorKind {
    /// The markup text is structurally malformed
    Parse(ParseError),

    /// A fail-fast lookup did not find a live entity
    NotFound { entity: EntityKind, key: String },

    /// A leader was assigned to a role in a country that does not own them
    NotOwnedLeader { country: u32, leader: u32, role: String },

    /// A leader was assigned as governor of a sector whose owner does not own them
    NotOwnedGovernor { sector: u32, leader: u32 },

    /// Missing or malformed game data
    GameData { code: &'static str, msg: String },

    /// Bookkeeping inside the save disagrees with itself
    InvalidState { code: &'static str, msg: String },

    /// The operation is deliberately unsupported
    NotImplemented(&'static str),

    /// Reading or writing an unpacked save failed
    Io(std::io::Error),
}

impl ErrorKind {
    pub fn offset(&self) -> Option<usize> {
        match self {
            ErrorKind::Parse(err) => Some(err.offset()),
            _ => None,
        }
    }

    pub fn code(&self) -> Cow<'static, str> {
        match self {
            ErrorKind::Parse(err) => Cow::Borrowed(err.kind().code()),
            ErrorKind::NotFound { entity, .. } => Cow::Owned(format!("{}-not-found", entity)),
            ErrorKind::NotOwnedLeader { .. } => Cow::Borrowed("relations/assign-not-owned-leader"),
            ErrorKind::NotOwnedGovernor { .. } => Cow::Borrowed("sector/assign-not-owned-governor"),
            ErrorKind::GameData { code, .. } => Cow::Borrowed(code),
            ErrorKind::InvalidState { code, .. } => Cow::Borrowed(code),
            ErrorKind::NotImplemented(_) => Cow::Borrowed("not-implemented"),
            ErrorKind::Io(_) => Cow::Borrowed("io"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            ErrorKind::Parse(ref err) => Some(err),
            ErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Parse(ref err) => write!(f, "{}", err),
            ErrorKind::NotFound { entity, ref key } => {
                write!(f, "{} not found: {}", entity, key)
            }
            ErrorKind::NotOwnedLeader {
                country,
                leader,
                ref role,
            } => write!(
                f,
                "trying to assign leader {} not owned by country {} as {}",
                leader, country, role
            ),
            ErrorKind::NotOwnedGovernor { sector, leader } => write!(
                f,
                "trying to assign leader {} as governor of sector {} while the sector owner does not own the leader",
                leader, sector
            ),
            ErrorKind::GameData { code, ref msg } => write!(f, "{}: {}", code, msg),
            ErrorKind::InvalidState { code, ref msg } => write!(f, "{}: {}", code, msg),
            ErrorKind::NotImplemented(what) => write!(f, "not implemented: {}", what),
            ErrorKind::Io(ref err) => write!(f, "io error: {}", err),
        }
    }
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        Error::new(ErrorKind::Parse(error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(error))
    }
}
