//! # xprofile-dom
//!
//! The durable side of an edited XML document. A [`Document`] owns every node
//! in an arena and hands out [`NodeId`] handles; nothing outside the arena
//! holds a private copy of an element, so edits made through any handle are
//! edits to the document itself.
//!
//! - **document**: the arena and its structural mutation API
//! - **parse**: builds a `Document` from text using `roxmltree`
//! - **serialize**: renders a document or subtree as line-oriented text
//! - **comment**: detection and recovery of commented-out markup

pub mod comment;
pub mod document;
pub mod error;
pub mod parse;
pub mod serialize;

pub use comment::{escape_markup, is_commented_markup, parse_fragment, unescape_markup};
pub use document::{Attribute, Document, ElementData, NodeKind, Prolog};
pub use error::DomError;
pub use serialize::{SerializeOptions, node_to_string, start_tag, to_string};
pub use xprofile_types::{Location, NodeId};
