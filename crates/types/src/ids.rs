//! Newtype handles for arena-allocated nodes.
//!
//! These types provide compile-time type safety to prevent mixing up an index
//! into a document's node table with an index into a tree's node table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A handle to a node owned by a `Document` arena.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a handle from a raw arena slot.
    pub fn new(slot: usize) -> Self {
        Self(slot as u32)
    }

    /// Returns the arena slot this handle points at.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A handle to a node owned by a `DocumentTree`.
///
/// Tree nodes never own document data; each one points at an element through
/// a [`NodeId`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeNodeId(u32);

impl TreeNodeId {
    pub fn new(slot: usize) -> Self {
        Self(slot as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TreeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
