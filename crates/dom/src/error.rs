use thiserror::Error;
use xprofile_types::{Location, NodeId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("XML parsing error at {location}: {message}")]
    Parse { message: String, location: Location },

    #[error("Node {0} does not exist in this document")]
    UnknownNode(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Position {position} is out of range for node {parent} with {len} children")]
    InvalidPosition {
        parent: NodeId,
        position: usize,
        len: usize,
    },

    #[error("Cannot place node {node} inside its own subtree")]
    CycleDetected { node: NodeId },

    #[error("Invalid element name '{0}'")]
    InvalidName(String),
}

impl From<roxmltree::Error> for DomError {
    fn from(e: roxmltree::Error) -> Self {
        let pos = e.pos();
        DomError::Parse {
            message: e.to_string(),
            location: Location {
                line: pos.row as usize,
                col: pos.col as usize,
            },
        }
    }
}
