//! # xprofile-store
//!
//! The persistent half of the editor. A profile is a SQLite database that
//! remembers, per document type (root element), which elements were seen under
//! which parents, which attributes they carried and which values those
//! attributes took.
//!
//! - **extract**: flattens a parsed document into [`ElementRecord`]s
//! - **store**: the [`ProfileStore`] with import, CRUD and relational queries
//! - **error**: [`StoreError`] and its prepare/execution/connection taxonomy

pub mod error;
pub mod extract;
pub mod store;

pub use error::{StoreError, StoreErrorKind};
pub use extract::{Extraction, extract_records};
pub use store::{ImportProgress, ImportSummary, ProfileStore};
pub use xprofile_types::ElementRecord;
