use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Machine-readable error codes for front ends that render failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TokenCorrupt,
    EventExpired,
    EventNotFound,
    InvalidLink,
    ItemNotFound,
    ActivityNotFound,
    DateNotFound,
    EmptyName,
    DuplicateActivity,
    StoreReadFailed,
    StoreWriteFailed,
    LockContention,
    ConfigParseError,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TokenCorrupt => "E1001",
            Self::EventExpired => "E1002",
            Self::EventNotFound => "E1003",
            Self::InvalidLink => "E1004",
            Self::ItemNotFound => "E2001",
            Self::ActivityNotFound => "E2002",
            Self::DateNotFound => "E2003",
            Self::EmptyName => "E2004",
            Self::DuplicateActivity => "E2005",
            Self::StoreReadFailed => "E5001",
            Self::StoreWriteFailed => "E5002",
            Self::LockContention => "E5003",
            Self::ConfigParseError => "E6001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TokenCorrupt => "Invalid or foreign link data",
            Self::EventExpired => "Event has expired",
            Self::EventNotFound => "Event not found",
            Self::InvalidLink => "Not an event link",
            Self::ItemNotFound => "Item not found",
            Self::ActivityNotFound => "Activity not found",
            Self::DateNotFound => "Date option not found",
            Self::EmptyName => "Name must not be empty",
            Self::DuplicateActivity => "Activity already proposed",
            Self::StoreReadFailed => "Event store read failed",
            Self::StoreWriteFailed => "Event store write failed",
            Self::LockContention => "Event store is locked",
            Self::ConfigParseError => "Config file parse error",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::TokenCorrupt => Some("Ask the organizer to share the link again."),
            Self::EventExpired => Some("Events are kept for a limited time; create a new one."),
            Self::EventNotFound => Some("Open the event through its full share link."),
            Self::InvalidLink => Some("Links look like <origin>#/event/<CODE>?data=<token>."),
            Self::ItemNotFound | Self::ActivityNotFound | Self::DateNotFound => {
                Some("Reload the newest link; the entry may have been removed.")
            }
            Self::EmptyName => None,
            Self::DuplicateActivity => Some("Vote for the existing activity instead."),
            Self::StoreReadFailed => Some("Check that the store file is readable JSON."),
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other potluck process finishes."),
            Self::ConfigParseError => Some("Fix syntax in potluck/config.toml and retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A token could not be turned back into an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The token is not URL-safe base64.
    #[error("token is not valid url-safe base64: {0}")]
    InvalidBase64(String),

    /// The decoded bytes are not UTF-8 text.
    #[error("token payload is not valid UTF-8")]
    InvalidUtf8,

    /// The decoded text is not JSON.
    #[error("token payload is not valid JSON: {0}")]
    InvalidJson(String),

    /// The JSON parsed but its top level is not an object.
    #[error("token payload is not a record")]
    NotARecord,

    /// The record does not fit the event schema.
    #[error("token payload does not match the event schema: {0}")]
    Shape(String),
}

/// A URL could not be read as an event link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("url has no /event/<code> route")]
    MissingEventCode,

    /// The route names one event and the data token carries another.
    #[error("link routes to event {route} but its data belongs to {token}")]
    CodeMismatch { route: String, token: String },
}

/// Failures reported by an [`crate::store::EventStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store contents could not be (de)serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store lock timed out after {waited:?} at {}", path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::Backend(_) => ErrorCode::StoreWriteFailed,
            Self::Serialize(_) => ErrorCode::StoreReadFailed,
            Self::LockTimeout { .. } => ErrorCode::LockContention,
        }
    }
}

/// A mutation was asked to do something the snapshot cannot support.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },

    #[error("item {0} not found")]
    ItemNotFound(String),

    #[error("activity {0} not found")]
    ActivityNotFound(String),

    #[error("date option {0} not found")]
    DateNotFound(String),

    #[error("activity {0:?} already exists")]
    DuplicateActivity(String),
}

impl MutationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyName { .. } => ErrorCode::EmptyName,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::ActivityNotFound(_) => ErrorCode::ActivityNotFound,
            Self::DateNotFound(_) => ErrorCode::DateNotFound,
            Self::DuplicateActivity(_) => ErrorCode::DuplicateActivity,
        }
    }
}

/// The tagged failure every pipeline operation returns.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("event {code} expired at {expired_at}")]
    Expired {
        code: String,
        expired_at: DateTime<Utc>,
    },

    #[error("event {code} not found")]
    NotFound { code: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl CoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Decode(_) => ErrorCode::TokenCorrupt,
            Self::Expired { .. } => ErrorCode::EventExpired,
            Self::NotFound { .. } => ErrorCode::EventNotFound,
            Self::Store(err) => err.code(),
            Self::Mutation(err) => err.code(),
            Self::Link(_) => ErrorCode::InvalidLink,
        }
    }

    /// Optional remediation hint for the person holding the link.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Expired and missing events are presented the same way.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Expired { .. } | Self::NotFound { .. })
    }
}
