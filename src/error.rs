//! Error types for MargaNav

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// MargaNav error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No initial waypoint list was configured
    #[error("Initial waypoints not set")]
    MissingInitialWaypoints,

    /// Waypoint index outside the valid range for the operation
    #[error("Waypoint index {index} out of range (list length {len})")]
    IndexOutOfRange {
        /// Requested index as received from the caller
        index: i64,
        /// List length at the time of the request
        len: usize,
    },

    /// Removing the sole remaining waypoint would empty the list
    #[error("Cannot remove the only waypoint")]
    CannotRemoveLastWaypoint,

    /// Operation exists on the interface but has no implementation
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Waypoint components are malformed
    #[error("Invalid waypoint: {0}")]
    InvalidWaypoint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No reply from the dispatcher within the deadline
    #[error("Request timeout")]
    Timeout,

    /// Dispatcher thread has gone away
    #[error("Sequencer channel closed")]
    ChannelClosed,

    /// Request rejected by a remote sequencer
    #[error("Request rejected ({kind:?}): {message}")]
    Rejected {
        kind: crate::streaming::messages::ErrorKind,
        message: String,
    },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
