use thiserror::Error;
use xprofile_dom::DomError;
use xprofile_traits::SchemaError;
use xprofile_types::{NodeId, TreeNodeId};

/// Rejected structural edits. The tree and its document are left untouched
/// whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Index {index} is out of range for {len} nodes")]
    InvalidIndex { index: usize, len: usize },

    #[error("Indices must be non-empty and strictly ascending")]
    UnsortedIndices,

    #[error("Tree node {0} does not exist")]
    UnknownNode(TreeNodeId),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("'{0}' would be a second document element")]
    SecondRoot(String),

    #[error("Node {0} is not a comment")]
    NotComment(NodeId),

    #[error("Invalid comment: {0}")]
    InvalidComment(String),

    #[error("Element '{0}' is not known to the schema")]
    UnknownElement(String),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}
