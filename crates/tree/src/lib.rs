//! # xprofile-tree
//!
//! The editing-time view of a document. A [`DocumentTree`] owns the
//! [`Document`](xprofile_dom::Document) it projects and keeps one
//! [`TreeNode`] per element, each holding only a handle into the document.
//!
//! - **tree**: construction, lookup and flattening indices
//! - **edit**: insert, remove, move and comment-out operations
//! - **populate**: reconstructing a tree from learned schema knowledge
//! - **exclusion**: checkbox-style include/exclude propagation
//! - **snippet**: generating repeated subtrees with incremented values
//! - **bridge**: mapping between text lines and flattening indices

pub mod bridge;
pub mod edit;
pub mod error;
pub mod exclusion;
pub mod node;
pub mod populate;
pub mod snippet;
pub mod tree;

pub use bridge::{LineClass, LineMap, SearchDirection};
pub use error::TreeError;
pub use node::{Notify, Placement, TreeConfig, TreeEvent, TreeNode};
pub use snippet::increment_value;
pub use tree::DocumentTree;
pub use xprofile_types::{NodeId, TreeNodeId};
