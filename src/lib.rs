//! # xprofile
//!
//! Learns the structure of XML documents into a persistent profile and lets a
//! document be edited as a tree whose nodes, document and text rendering stay
//! in sync.
//!
//! The pieces live in their own crates and are re-exported here:
//! - `xprofile-dom`: the owned, mutable document
//! - `xprofile-store`: record extraction and the SQLite profile
//! - `xprofile-tree`: the editable tree and the line/index bridge
//!
//! [`Session`] ties a profile and an open document together.

pub mod config;
pub mod error;
pub mod session;

pub use config::{DEFAULT_LARGE_FILE_WARNING_BYTES, EditorConfig};
pub use error::XProfileError;
pub use session::{Session, SessionBuilder};

pub use xprofile_dom::{Document, DomError, NodeId, SerializeOptions};
pub use xprofile_store::{ImportProgress, ImportSummary, ProfileStore, StoreError, StoreErrorKind};
pub use xprofile_traits::{InMemorySchemaProvider, SchemaError, SchemaProvider};
pub use xprofile_tree::{
    DocumentTree, LineClass, LineMap, Notify, Placement, SearchDirection, TreeConfig, TreeError,
    TreeEvent, TreeNode, TreeNodeId,
};
pub use xprofile_types::ElementRecord;
