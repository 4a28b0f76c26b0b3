// src/error.rs
use thiserror::Error;
use xprofile_dom::DomError;
use xprofile_store::StoreError;
use xprofile_traits::SchemaError;
use xprofile_tree::TreeError;

/// Every failure a session or the command line can report.
#[derive(Error, Debug)]
pub enum XProfileError {
    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Profile error: {0}")]
    Store(#[from] StoreError),

    #[error("Tree edit rejected: {0}")]
    Tree(#[from] TreeError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No document is open")]
    NoDocument,
}

impl XProfileError {
    /// True if the profile database itself could not be reached.
    pub fn is_fatal(&self) -> bool {
        matches!(self, XProfileError::Store(e) if e.is_fatal())
    }
}
