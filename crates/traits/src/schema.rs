//! SchemaProvider trait for abstracting access to learned schema knowledge.
//!
//! The document tree asks a provider which children and attributes are known
//! for an element, and teaches it new parent/child relationships when the user
//! restructures a document. It is not tied to any particular storage.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::RwLock;
use thiserror::Error;
use xprofile_types::ElementRecord;

/// Error type for schema lookups and updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema source unavailable: {0}")]
    Unavailable(String),

    #[error("Schema query failed: {0}")]
    Query(String),

    #[error("Invalid schema input: {0}")]
    InvalidInput(String),
}

/// A source of element/attribute knowledge for one or more document types.
///
/// # Implementations
///
/// - `ProfileStore` (in `xprofile-store`): SQLite backed, persistent
/// - `InMemorySchemaProvider`: record set held in memory, used by tests and
///   for scratch sessions without a profile
pub trait SchemaProvider: Debug {
    /// Every root element name the provider knows, sorted.
    fn roots(&self) -> Result<Vec<String>, SchemaError>;

    /// Sorted unique element names (including the root itself) known for `root`.
    fn known_elements(&self, root: &str) -> Result<Vec<String>, SchemaError>;

    /// Sorted unique child element names recorded under `element` for `root`.
    ///
    /// `parent` identifies the occurrence of `element` being expanded. Child
    /// edges are recorded per element name, so the result does not depend on it.
    fn children(&self, element: &str, parent: &str, root: &str) -> Result<Vec<String>, SchemaError>;

    /// Sorted unique attribute names recorded for `element` under `parent`.
    ///
    /// An empty `parent` matches any parent.
    fn attributes(&self, element: &str, parent: &str, root: &str)
    -> Result<Vec<String>, SchemaError>;

    /// Records that `element` may appear under `parent` in documents of `root`.
    fn add_element(&self, element: &str, parent: &str, root: &str) -> Result<(), SchemaError>;

    /// Returns a human-readable name for this provider (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// An in-memory schema provider.
#[derive(Debug, Default)]
pub struct InMemorySchemaProvider {
    records: RwLock<BTreeSet<ElementRecord>>,
    roots: RwLock<BTreeSet<String>>,
}

impl InMemorySchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider from a set of records, registering every root they name.
    pub fn from_records(records: impl IntoIterator<Item = ElementRecord>) -> Self {
        let provider = Self::new();
        for record in records {
            // A freshly built provider cannot be poisoned.
            let _ = provider.insert(record);
        }
        provider
    }

    /// Adds one record and its root.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Unavailable` if an internal lock is poisoned.
    pub fn insert(&self, record: ElementRecord) -> Result<(), SchemaError> {
        self.roots
            .write()
            .map_err(|_| poisoned())?
            .insert(record.root.clone());
        self.records.write().map_err(|_| poisoned())?.insert(record);
        Ok(())
    }

    /// Returns a copy of every record, in sorted order.
    pub fn records(&self) -> Vec<ElementRecord> {
        self.records
            .read()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the number of records.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns `true` if the lock is poisoned (safe default).
    pub fn is_empty(&self) -> bool {
        self.records.read().map(|r| r.is_empty()).unwrap_or(true)
    }

    fn collect<F>(&self, select: F) -> Result<Vec<String>, SchemaError>
    where
        F: Fn(&ElementRecord) -> Option<&str>,
    {
        let records = self.records.read().map_err(|_| poisoned())?;
        let names: BTreeSet<String> = records
            .iter()
            .filter_map(|r| select(r).map(str::to_string))
            .collect();
        Ok(names.into_iter().collect())
    }
}

fn poisoned() -> SchemaError {
    SchemaError::Unavailable("schema store lock poisoned".to_string())
}

impl SchemaProvider for InMemorySchemaProvider {
    fn roots(&self) -> Result<Vec<String>, SchemaError> {
        let roots = self.roots.read().map_err(|_| poisoned())?;
        Ok(roots.iter().cloned().collect())
    }

    fn known_elements(&self, root: &str) -> Result<Vec<String>, SchemaError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut names: BTreeSet<String> = BTreeSet::new();
        for record in records.iter().filter(|r| r.root == root) {
            names.insert(record.element.clone());
            names.insert(record.parent.clone());
        }
        Ok(names.into_iter().collect())
    }

    fn children(&self, element: &str, _parent: &str, root: &str) -> Result<Vec<String>, SchemaError> {
        self.collect(|r| (r.root == root && r.parent == element).then_some(r.element.as_str()))
    }

    fn attributes(
        &self,
        element: &str,
        parent: &str,
        root: &str,
    ) -> Result<Vec<String>, SchemaError> {
        self.collect(|r| {
            (r.root == root
                && r.element == element
                && (parent.is_empty() || r.parent == parent)
                && !r.attribute.is_empty())
            .then_some(r.attribute.as_str())
        })
    }

    fn add_element(&self, element: &str, parent: &str, root: &str) -> Result<(), SchemaError> {
        if element.is_empty() || parent.is_empty() || root.is_empty() {
            return Err(SchemaError::InvalidInput(format!(
                "element, parent and root must be non-empty (got '{}', '{}', '{}')",
                element, parent, root
            )));
        }
        let exists = self
            .records
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .any(|r| r.element == element && r.parent == parent && r.root == root);
        if !exists {
            self.insert(ElementRecord::edge(element, parent, root))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "InMemorySchemaProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_schema() -> InMemorySchemaProvider {
        InMemorySchemaProvider::from_records([
            ElementRecord::attribute("server", "config", "config", "host", "a"),
            ElementRecord::attribute("server", "config", "config", "port", "80"),
            ElementRecord::edge("logging", "config", "config"),
        ])
    }

    #[test]
    fn test_known_elements_include_root() {
        let schema = config_schema();
        assert_eq!(
            schema.known_elements("config").unwrap(),
            vec!["config", "logging", "server"]
        );
        assert_eq!(schema.roots().unwrap(), vec!["config"]);
    }

    #[test]
    fn test_children_and_attributes() {
        let schema = config_schema();
        assert_eq!(
            schema.children("config", "", "config").unwrap(),
            vec!["logging", "server"]
        );
        assert_eq!(
            schema.attributes("server", "config", "config").unwrap(),
            vec!["host", "port"]
        );
        assert!(schema.attributes("server", "other", "config").unwrap().is_empty());
        assert_eq!(schema.attributes("server", "", "config").unwrap().len(), 2);
    }

    #[test]
    fn test_add_element_is_idempotent() {
        let schema = config_schema();
        let before = schema.len();
        schema.add_element("server", "config", "config").unwrap();
        assert_eq!(schema.len(), before);

        schema.add_element("cache", "server", "config").unwrap();
        assert_eq!(schema.len(), before + 1);
        assert_eq!(schema.children("server", "config", "config").unwrap(), vec!["cache"]);
    }

    #[test]
    fn test_add_element_rejects_empty_names() {
        let schema = InMemorySchemaProvider::new();
        assert!(matches!(
            schema.add_element("", "config", "config"),
            Err(SchemaError::InvalidInput(_))
        ));
        assert!(schema.is_empty());
    }
}
