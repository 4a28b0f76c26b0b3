use thiserror::Error;
use xprofile_traits::SchemaError;

/// The coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Prepare,
    Execution,
    Connection,
    InvalidInput,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open profile '{path}': {source}")]
    Connection {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to prepare statement: {0}")]
    Prepare(#[source] rusqlite::Error),

    #[error("Statement execution failed: {0}")]
    Execution(#[source] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Element '{0}' is not known to this profile")]
    UnknownElement(String),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Connection { .. } => StoreErrorKind::Connection,
            StoreError::Prepare(_) => StoreErrorKind::Prepare,
            StoreError::Execution(_) => StoreErrorKind::Execution,
            StoreError::InvalidInput(_) | StoreError::UnknownElement(_) => {
                StoreErrorKind::InvalidInput
            }
        }
    }

    /// A fatal error leaves the profile unusable for the rest of the session.
    pub fn is_fatal(&self) -> bool {
        self.kind() == StoreErrorKind::Connection
    }
}

impl From<StoreError> for SchemaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection { .. } => SchemaError::Unavailable(err.to_string()),
            StoreError::InvalidInput(msg) => SchemaError::InvalidInput(msg),
            other => SchemaError::Query(other.to_string()),
        }
    }
}
