//! The SQLite-backed profile store.
//!
//! Two relations are persisted: `roots`, the set of known document types, and
//! `element_records`, the normalized (value, attribute, element, parent, root)
//! tuples. Children and attribute lists are never stored; they are derived by
//! query.

use crate::error::StoreError;
use crate::extract::extract_records;
use rusqlite::{Connection, Params, Transaction, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use xprofile_dom::Document;
use xprofile_traits::{SchemaError, SchemaProvider};
use xprofile_types::ElementRecord;

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS roots (
      name TEXT PRIMARY KEY NOT NULL
    );

    CREATE TABLE IF NOT EXISTS element_records (
      value TEXT NOT NULL DEFAULT '',
      attribute TEXT NOT NULL DEFAULT '',
      element TEXT NOT NULL,
      parent TEXT NOT NULL,
      root TEXT NOT NULL REFERENCES roots(name) ON DELETE CASCADE,
      UNIQUE (value, attribute, element, parent, root)
    );

    CREATE INDEX IF NOT EXISTS idx_records_root_parent ON element_records(root, parent);
    CREATE INDEX IF NOT EXISTS idx_records_element ON element_records(element, attribute);
"#;

const INSERT_RECORD: &str = "INSERT OR REPLACE INTO element_records(value, attribute, element, parent, root) VALUES (?1, ?2, ?3, ?4, ?5)";
const INSERT_ROOT: &str = "INSERT OR IGNORE INTO roots(name) VALUES (?1)";

/// How often import progress is reported, in records.
const PROGRESS_STEP: usize = 256;

/// Progress of a running import. Purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    pub written: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub root: String,
    pub records: usize,
}

/// A single open profile database.
#[derive(Debug)]
pub struct ProfileStore {
    conn: Connection,
    path: Option<PathBuf>,
}

fn require_names(fields: &[(&str, &str)]) -> Result<(), StoreError> {
    match fields.iter().find(|(_, value)| value.is_empty()) {
        Some((field, _)) => Err(StoreError::InvalidInput(format!("{} must not be empty", field))),
        None => Ok(()),
    }
}

impl ProfileStore {
    /// Opens (creating if needed) the profile database at `path`.
    ///
    /// Any failure here is a connection failure: the profile cannot be used.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let connection_error = |source| StoreError::Connection {
            path: path.display().to_string(),
            source,
        };
        let conn = Connection::open(&path).map_err(connection_error)?;
        conn.execute_batch(SCHEMA).map_err(connection_error)?;
        log::info!("Opened profile {}", path.display());
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Opens a private profile that lives only as long as the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection_error = |source| StoreError::Connection {
            path: ":memory:".to_string(),
            source,
        };
        let conn = Connection::open_in_memory().map_err(connection_error)?;
        conn.execute_batch(SCHEMA).map_err(connection_error)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn query_names<P: Params>(&self, sql: &str, params: P) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(StoreError::Prepare)?;
        let rows = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(StoreError::Execution)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Execution)
    }

    fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(StoreError::Prepare)?;
        stmt.execute(params).map_err(StoreError::Execution)
    }

    // --- Mutation ---

    /// Adds `name` to the root set. Idempotent.
    pub fn add_root(&self, name: &str) -> Result<(), StoreError> {
        require_names(&[("root", name)])?;
        self.execute(INSERT_ROOT, params![name])?;
        Ok(())
    }

    /// Records a bare `element` under `parent` edge unless one already exists
    /// for that exact triple. The root is added to the root set if needed.
    pub fn add_element(&self, element: &str, parent: &str, root: &str) -> Result<(), StoreError> {
        require_names(&[("element", element), ("parent", parent), ("root", root)])?;
        let exists: Vec<String> = self.query_names(
            "SELECT element FROM element_records WHERE element = ?1 AND parent = ?2 AND root = ?3 LIMIT 1",
            params![element, parent, root],
        )?;
        if !exists.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction().map_err(StoreError::Execution)?;
        tx.execute(INSERT_ROOT, params![root])
            .map_err(StoreError::Execution)?;
        tx.execute(INSERT_RECORD, params!["", "", element, parent, root])
            .map_err(StoreError::Execution)?;
        tx.commit().map_err(StoreError::Execution)?;
        log::debug!("Learned <{}> under <{}> for root <{}>", element, parent, root);
        Ok(())
    }

    /// Imports every record of `doc` in one transaction.
    pub fn import_document(&mut self, doc: &Document) -> Result<ImportSummary, StoreError> {
        self.import_document_with_progress(doc, |_| {})
    }

    /// Imports `doc`, reporting progress as records are written.
    ///
    /// Either every record and the root are committed, or nothing is.
    pub fn import_document_with_progress<F>(
        &mut self,
        doc: &Document,
        mut progress: F,
    ) -> Result<ImportSummary, StoreError>
    where
        F: FnMut(ImportProgress),
    {
        let extraction = extract_records(doc)
            .ok_or_else(|| StoreError::InvalidInput("document has no root element".to_string()))?;
        let total = extraction.records.len();

        let tx = self.conn.transaction().map_err(StoreError::Execution)?;
        match write_import(&tx, &extraction.root, &extraction.records, &mut progress) {
            Ok(()) => {
                tx.commit().map_err(StoreError::Execution)?;
                log::info!("Imported {} records for <{}>", total, extraction.root);
                Ok(ImportSummary {
                    root: extraction.root,
                    records: total,
                })
            }
            Err(e) => {
                log::warn!("Import of <{}> failed, rolling back: {}", extraction.root, e);
                tx.rollback().map_err(StoreError::Execution)?;
                Err(e)
            }
        }
    }

    /// Sets the known values of `attribute` on `element`.
    ///
    /// The attribute is recorded in every (parent, root) context the element is
    /// known in. With `replace` the previous values are discarded; otherwise the
    /// new values are merged with them.
    pub fn update_attribute_values<S: AsRef<str>>(
        &mut self,
        element: &str,
        attribute: &str,
        values: &[S],
        replace: bool,
    ) -> Result<(), StoreError> {
        require_names(&[("element", element), ("attribute", attribute)])?;

        let contexts = self.element_contexts(element)?;
        if contexts.is_empty() {
            return Err(StoreError::UnknownElement(element.to_string()));
        }

        let mut values: BTreeSet<&str> = values.iter().map(|v| v.as_ref()).collect();
        if values.is_empty() {
            // Keep the attribute slot known even without any value.
            values.insert("");
        }

        let tx = self.conn.transaction().map_err(StoreError::Execution)?;
        {
            if replace {
                tx.execute(
                    "DELETE FROM element_records WHERE element = ?1 AND attribute = ?2",
                    params![element, attribute],
                )
                .map_err(StoreError::Execution)?;
            }
            let mut insert = tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO element_records(value, attribute, element, parent, root) VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(StoreError::Prepare)?;
            for (parent, root) in &contexts {
                for value in &values {
                    insert
                        .execute(params![value, attribute, element, parent, root])
                        .map_err(StoreError::Execution)?;
                }
            }
        }
        tx.commit().map_err(StoreError::Execution)?;
        log::debug!(
            "{} {} value(s) for {}@{}",
            if replace { "Replaced" } else { "Merged" },
            values.len(),
            element,
            attribute
        );
        Ok(())
    }

    /// Deletes every record of `element` under `parent` for `root`.
    pub fn remove_element(&self, element: &str, parent: &str, root: &str) -> Result<usize, StoreError> {
        require_names(&[("element", element), ("parent", parent), ("root", root)])?;
        self.execute(
            "DELETE FROM element_records WHERE element = ?1 AND parent = ?2 AND root = ?3",
            params![element, parent, root],
        )
    }

    /// Removes a document type and, in the same transaction, every record
    /// that belongs to it. Returns the number of records deleted.
    pub fn remove_root_element(&mut self, root: &str) -> Result<usize, StoreError> {
        require_names(&[("root", root)])?;
        let tx = self.conn.transaction().map_err(StoreError::Execution)?;
        let deleted = tx
            .execute("DELETE FROM element_records WHERE root = ?1", params![root])
            .map_err(StoreError::Execution)?;
        tx.execute("DELETE FROM roots WHERE name = ?1", params![root])
            .map_err(StoreError::Execution)?;
        tx.commit().map_err(StoreError::Execution)?;
        log::info!("Removed root <{}> and {} records", root, deleted);
        Ok(deleted)
    }

    // --- Queries ---

    pub fn known_roots(&self) -> Result<Vec<String>, StoreError> {
        self.query_names("SELECT name FROM roots ORDER BY name", [])
    }

    pub fn is_known_root(&self, name: &str) -> Result<bool, StoreError> {
        Ok(!self
            .query_names("SELECT name FROM roots WHERE name = ?1", params![name])?
            .is_empty())
    }

    /// Sorted unique element names known for `root`, the root itself included.
    pub fn known_elements(&self, root: &str) -> Result<Vec<String>, StoreError> {
        self.query_names(
            r#"
            SELECT element FROM element_records WHERE root = ?1
            UNION SELECT parent FROM element_records WHERE root = ?1
            UNION SELECT name FROM roots WHERE name = ?1
            ORDER BY 1
            "#,
            params![root],
        )
    }

    /// Sorted unique child names recorded under `element` for `root`.
    ///
    /// `parent` names the occurrence being expanded; children are recorded per
    /// element name, so it does not narrow the result.
    pub fn children(&self, element: &str, _parent: &str, root: &str) -> Result<Vec<String>, StoreError> {
        self.query_names(
            "SELECT DISTINCT element FROM element_records WHERE root = ?1 AND parent = ?2 ORDER BY element",
            params![root, element],
        )
    }

    /// Sorted unique attribute names of `element` under `parent` (any parent if empty).
    pub fn attributes(&self, element: &str, parent: &str, root: &str) -> Result<Vec<String>, StoreError> {
        self.query_names(
            r#"
            SELECT DISTINCT attribute FROM element_records
            WHERE root = ?1 AND element = ?2 AND (?3 = '' OR parent = ?3) AND attribute <> ''
            ORDER BY attribute
            "#,
            params![root, element, parent],
        )
    }

    /// Sorted unique non-empty values ever recorded for `element`@`attribute`.
    pub fn attribute_values(&self, element: &str, attribute: &str) -> Result<Vec<String>, StoreError> {
        self.query_names(
            r#"
            SELECT DISTINCT value FROM element_records
            WHERE element = ?1 AND attribute = ?2 AND value <> ''
            ORDER BY value
            "#,
            params![element, attribute],
        )
    }

    /// True iff `element` is recorded under exactly one parent within `root`.
    ///
    /// `parent` does not narrow the check; see [`is_safe_to_remove`](Self::is_safe_to_remove).
    pub fn is_unique_child_element(&self, root: &str, _parent: &str, element: &str) -> Result<bool, StoreError> {
        Ok(self.parents_of(root, element)?.len() == 1)
    }

    /// Removal policy: an element is only safe to forget when `parent` is its
    /// one and only parent and it is not itself the root of some document type.
    pub fn is_safe_to_remove(&self, root: &str, parent: &str, element: &str) -> Result<bool, StoreError> {
        let parents = self.parents_of(root, element)?;
        Ok(parents.len() == 1 && parents[0] == parent && !self.is_known_root(element)?)
    }

    fn parents_of(&self, root: &str, element: &str) -> Result<Vec<String>, StoreError> {
        self.query_names(
            "SELECT DISTINCT parent FROM element_records WHERE root = ?1 AND element = ?2",
            params![root, element],
        )
    }

    /// Every record of `root`, sorted.
    pub fn records(&self, root: &str) -> Result<Vec<ElementRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                r#"
                SELECT root, parent, element, attribute, value FROM element_records
                WHERE root = ?1
                ORDER BY parent, element, attribute, value
                "#,
            )
            .map_err(StoreError::Prepare)?;
        let rows = stmt
            .query_map(params![root], |row| {
                Ok(ElementRecord {
                    root: row.get(0)?,
                    parent: row.get(1)?,
                    element: row.get(2)?,
                    attribute: row.get(3)?,
                    value: row.get(4)?,
                })
            })
            .map_err(StoreError::Execution)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Execution)
    }

    pub fn record_count(&self) -> Result<usize, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM element_records")
            .map_err(StoreError::Prepare)?;
        let count: i64 = stmt
            .query_row([], |row| row.get(0))
            .map_err(StoreError::Execution)?;
        Ok(count as usize)
    }

    fn element_contexts(&self, element: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT DISTINCT parent, root FROM element_records WHERE element = ?1 ORDER BY root, parent",
            )
            .map_err(StoreError::Prepare)?;
        let rows = stmt
            .query_map(params![element], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(StoreError::Execution)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Execution)
    }
}

fn write_import<F>(
    tx: &Transaction<'_>,
    root: &str,
    records: &[ElementRecord],
    progress: &mut F,
) -> Result<(), StoreError>
where
    F: FnMut(ImportProgress),
{
    tx.execute(INSERT_ROOT, params![root])
        .map_err(StoreError::Execution)?;

    let total = records.len();
    let mut insert = tx.prepare_cached(INSERT_RECORD).map_err(StoreError::Prepare)?;
    for (written, record) in records.iter().enumerate() {
        insert
            .execute(params![
                record.value,
                record.attribute,
                record.element,
                record.parent,
                record.root
            ])
            .map_err(StoreError::Execution)?;
        if (written + 1) % PROGRESS_STEP == 0 {
            progress(ImportProgress {
                written: written + 1,
                total,
            });
        }
    }
    progress(ImportProgress {
        written: total,
        total,
    });
    Ok(())
}

impl SchemaProvider for ProfileStore {
    fn roots(&self) -> Result<Vec<String>, SchemaError> {
        Ok(self.known_roots()?)
    }

    fn known_elements(&self, root: &str) -> Result<Vec<String>, SchemaError> {
        Ok(ProfileStore::known_elements(self, root)?)
    }

    fn children(&self, element: &str, parent: &str, root: &str) -> Result<Vec<String>, SchemaError> {
        Ok(ProfileStore::children(self, element, parent, root)?)
    }

    fn attributes(
        &self,
        element: &str,
        parent: &str,
        root: &str,
    ) -> Result<Vec<String>, SchemaError> {
        Ok(ProfileStore::attributes(self, element, parent, root)?)
    }

    fn add_element(&self, element: &str, parent: &str, root: &str) -> Result<(), SchemaError> {
        Ok(ProfileStore::add_element(self, element, parent, root)?)
    }

    fn name(&self) -> &'static str {
        "ProfileStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str =
        r#"<config><server host="a" port="80"/><server host="b" port="81"/></config>"#;

    fn imported(xml: &str) -> ProfileStore {
        let mut store = ProfileStore::open_in_memory().unwrap();
        store.import_document(&Document::parse(xml).unwrap()).unwrap();
        store
    }

    #[test]
    fn test_config_scenario() {
        let store = imported(CONFIG);
        assert_eq!(store.known_elements("config").unwrap(), vec!["config", "server"]);
        assert_eq!(store.children("config", "", "config").unwrap(), vec!["server"]);
        assert_eq!(
            store.attributes("server", "config", "config").unwrap(),
            vec!["host", "port"]
        );
        assert_eq!(store.attribute_values("server", "port").unwrap(), vec!["80", "81"]);
        assert_eq!(store.known_roots().unwrap(), vec!["config"]);
    }

    #[test]
    fn test_import_is_idempotent() {
        let mut store = imported(CONFIG);
        let once = store.records("config").unwrap();
        let summary = store
            .import_document(&Document::parse(CONFIG).unwrap())
            .unwrap();
        assert_eq!(summary.records, 4);
        assert_eq!(store.records("config").unwrap(), once);
        assert_eq!(store.record_count().unwrap(), 4);
    }

    #[test]
    fn test_import_reports_progress() {
        let mut store = ProfileStore::open_in_memory().unwrap();
        let mut seen = Vec::new();
        store
            .import_document_with_progress(&Document::parse(CONFIG).unwrap(), |p| seen.push(p))
            .unwrap();
        assert_eq!(seen.last(), Some(&ImportProgress { written: 4, total: 4 }));
    }

    #[test]
    fn test_import_rejects_empty_document() {
        let mut store = ProfileStore::open_in_memory().unwrap();
        let err = store.import_document(&Document::new()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert!(store.known_roots().unwrap().is_empty());
    }

    #[test]
    fn test_add_element_is_idempotent_and_validates() {
        let store = imported(CONFIG);
        let before = store.record_count().unwrap();
        store.add_element("server", "config", "config").unwrap();
        assert_eq!(store.record_count().unwrap(), before);

        store.add_element("cache", "server", "config").unwrap();
        assert_eq!(store.record_count().unwrap(), before + 1);
        assert_eq!(store.children("server", "config", "config").unwrap(), vec!["cache"]);

        let err = store.add_element("", "config", "config").unwrap_err();
        assert_eq!(err.kind(), crate::StoreErrorKind::InvalidInput);
        assert!(!err.is_fatal());
    }

    fn fail_on(store: &ProfileStore, element: &str) {
        store
            .conn
            .execute_batch(&format!(
                "CREATE TRIGGER reject BEFORE INSERT ON element_records \
                 WHEN NEW.element = '{element}' BEGIN SELECT RAISE(ABORT, 'rejected'); END;"
            ))
            .unwrap();
    }

    #[test]
    fn test_failed_import_rolls_back() {
        let mut store = ProfileStore::open_in_memory().unwrap();
        fail_on(&store, "port");
        let doc = Document::parse(r#"<config><server host="a"/><port n="1"/></config>"#).unwrap();
        let err = store.import_document(&doc).unwrap_err();
        assert!(matches!(err, StoreError::Execution(_)));
        assert_eq!(store.record_count().unwrap(), 0);
        assert!(store.known_roots().unwrap().is_empty());
    }

    #[test]
    fn test_failed_add_element_leaves_no_root() {
        let store = ProfileStore::open_in_memory().unwrap();
        fail_on(&store, "item");
        assert!(store.add_element("item", "list", "list").is_err());
        assert!(store.known_roots().unwrap().is_empty());
        assert_eq!(store.record_count().unwrap(), 0);
    }

    #[test]
    fn test_add_element_registers_new_root() {
        let store = ProfileStore::open_in_memory().unwrap();
        store.add_element("item", "list", "list").unwrap();
        assert_eq!(store.known_roots().unwrap(), vec!["list"]);
        assert_eq!(store.known_elements("list").unwrap(), vec!["item", "list"]);
    }

    #[test]
    fn test_merge_and_replace_attribute_values() {
        let mut store = imported(r#"<r><e a="x"/><e a="z"/></r>"#);
        store.update_attribute_values("e", "a", &["x", "y"], false).unwrap();
        assert_eq!(store.attribute_values("e", "a").unwrap(), vec!["x", "y", "z"]);

        store.update_attribute_values("e", "a", &["x", "y"], true).unwrap();
        assert_eq!(store.attribute_values("e", "a").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn test_update_inserts_missing_attribute() {
        let mut store = imported("<r><e/></r>");
        store.update_attribute_values("e", "kind", &["new"], false).unwrap();
        assert_eq!(store.attributes("e", "r", "r").unwrap(), vec!["kind"]);
        assert_eq!(store.attribute_values("e", "kind").unwrap(), vec!["new"]);

        let err = store
            .update_attribute_values("missing", "kind", &["v"], true)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownElement(_)));
    }

    #[test]
    fn test_unique_child_detection() {
        let store = imported("<r><a><c/></a><b/></r>");
        assert!(store.is_unique_child_element("r", "a", "c").unwrap());
        // Uniqueness is about the element, whichever parent is asked about.
        assert!(store.is_unique_child_element("r", "b", "c").unwrap());
        assert!(store.is_safe_to_remove("r", "a", "c").unwrap());
        assert!(!store.is_safe_to_remove("r", "b", "c").unwrap());

        store.add_element("c", "b", "r").unwrap();
        assert!(!store.is_unique_child_element("r", "a", "c").unwrap());
        assert!(!store.is_safe_to_remove("r", "a", "c").unwrap());
    }

    #[test]
    fn test_safe_to_remove_protects_roots() {
        let mut store = imported("<r><other/></r>");
        assert!(store.is_safe_to_remove("r", "r", "other").unwrap());
        store
            .import_document(&Document::parse("<other><x/></other>").unwrap())
            .unwrap();
        assert!(!store.is_safe_to_remove("r", "r", "other").unwrap());
    }

    #[test]
    fn test_remove_element_and_root() {
        let mut store = imported(CONFIG);
        store.add_element("cache", "config", "config").unwrap();
        assert_eq!(store.remove_element("cache", "config", "config").unwrap(), 1);
        assert_eq!(store.children("config", "", "config").unwrap(), vec!["server"]);

        let removed = store.remove_root_element("config").unwrap();
        assert_eq!(removed, 4);
        assert!(store.known_roots().unwrap().is_empty());
        assert!(store.records("config").unwrap().is_empty());
    }

    #[test]
    fn test_open_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProfileStore::open(dir.path()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.kind(), crate::StoreErrorKind::Connection);
    }

    #[test]
    fn test_profile_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.db");
        {
            let mut store = ProfileStore::open(&path).unwrap();
            store.import_document(&Document::parse(CONFIG).unwrap()).unwrap();
        }
        let store = ProfileStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.attribute_values("server", "host").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_schema_provider_view() {
        let store = imported(CONFIG);
        let provider: &dyn SchemaProvider = &store;
        assert_eq!(provider.roots().unwrap(), vec!["config"]);
        assert_eq!(
            provider.attributes("server", "", "config").unwrap(),
            vec!["host", "port"]
        );
        assert!(matches!(
            provider.add_element("x", "", "config"),
            Err(SchemaError::InvalidInput(_))
        ));
    }
}
