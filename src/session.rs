//! An editing session: one profile database and at most one open document.

use crate::config::EditorConfig;
use crate::error::XProfileError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use xprofile_dom::{Document, NodeId};
use xprofile_store::{ImportProgress, ImportSummary, ProfileStore};
use xprofile_tree::{DocumentTree, Placement, TreeNodeId};

#[derive(Debug, Clone, Default)]
enum ProfileLocation {
    #[default]
    FromConfig,
    Path(PathBuf),
    InMemory,
}

/// A builder for creating a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    profile: ProfileLocation,
    config: EditorConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the whole configuration. Call before the finer-grained setters.
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Opens (or creates) the profile database at `path`.
    pub fn with_profile_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.profile = ProfileLocation::Path(path.as_ref().to_path_buf());
        self
    }

    /// Uses a throwaway profile that lives only as long as the session.
    pub fn with_in_memory_profile(mut self) -> Self {
        self.profile = ProfileLocation::InMemory;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.config.indent = indent;
        self
    }

    /// Validates the configuration and opens the profile.
    pub fn build(self) -> Result<Session, XProfileError> {
        self.config.validate()?;
        let store = match self.profile {
            ProfileLocation::Path(path) => ProfileStore::open(path)?,
            ProfileLocation::InMemory => ProfileStore::open_in_memory()?,
            ProfileLocation::FromConfig => match &self.config.profile_path {
                Some(path) => ProfileStore::open(path)?,
                None => {
                    return Err(XProfileError::Config(
                        "No profile has been configured. Use `with_profile_path` or `with_in_memory_profile`."
                            .to_string(),
                    ));
                }
            },
        };
        log::info!(
            "Session started with profile {}",
            store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string())
        );
        Ok(Session {
            store,
            tree: None,
            config: self.config,
        })
    }
}

/// Ties the profile store to the document being edited.
///
/// Structural edits go through the session so that relationships the user
/// creates are taught to the profile as they happen.
#[derive(Debug)]
pub struct Session {
    store: ProfileStore,
    tree: Option<DocumentTree>,
    config: EditorConfig,
}

fn read_text(path: &Path) -> Result<String, XProfileError> {
    fs::read_to_string(path).map_err(|e| {
        XProfileError::Io(io::Error::new(
            e.kind(),
            format!("Failed to read '{}': {}", path.display(), e),
        ))
    })
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProfileStore {
        &mut self.store
    }

    pub fn tree(&self) -> Option<&DocumentTree> {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> Option<&mut DocumentTree> {
        self.tree.as_mut()
    }

    fn open_tree(&mut self) -> Result<&mut DocumentTree, XProfileError> {
        self.tree.as_mut().ok_or(XProfileError::NoDocument)
    }

    // --- Documents ---

    /// Parses `text` and makes it the open document, replacing any other.
    pub fn open_document(&mut self, text: &str) -> Result<&DocumentTree, XProfileError> {
        self.config.warn_if_large("Document", text.len());
        let tree = DocumentTree::parse(text, self.config.tree_config())?;
        log::info!("Opened document with {} elements", tree.len());
        Ok(&*self.tree.insert(tree))
    }

    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&DocumentTree, XProfileError> {
        let text = read_text(path.as_ref())?;
        self.open_document(&text)
    }

    pub fn close_document(&mut self) -> Option<DocumentTree> {
        self.tree.take()
    }

    /// The open document rendered as text.
    pub fn document_text(&self) -> Result<String, XProfileError> {
        self.tree
            .as_ref()
            .map(DocumentTree::text)
            .ok_or(XProfileError::NoDocument)
    }

    pub fn save_document<P: AsRef<Path>>(&self, path: P) -> Result<(), XProfileError> {
        let text = self.document_text()?;
        fs::write(path.as_ref(), text)?;
        log::info!("Saved document to {}", path.as_ref().display());
        Ok(())
    }

    // --- Learning ---

    /// Learns the structure of `text` without opening it.
    pub fn import_text(&mut self, text: &str) -> Result<ImportSummary, XProfileError> {
        self.import_text_with_progress(text, |_| {})
    }

    pub fn import_text_with_progress<F>(
        &mut self,
        text: &str,
        progress: F,
    ) -> Result<ImportSummary, XProfileError>
    where
        F: FnMut(ImportProgress),
    {
        self.config.warn_if_large("Import", text.len());
        let doc = Document::parse(text)?;
        Ok(self.store.import_document_with_progress(&doc, progress)?)
    }

    pub fn import_file<P, F>(&mut self, path: P, progress: F) -> Result<ImportSummary, XProfileError>
    where
        P: AsRef<Path>,
        F: FnMut(ImportProgress),
    {
        let text = read_text(path.as_ref())?;
        self.import_text_with_progress(&text, progress)
    }

    /// Learns the structure of the open document, as currently edited.
    pub fn import_current(&mut self) -> Result<ImportSummary, XProfileError> {
        let tree = self.tree.as_ref().ok_or(XProfileError::NoDocument)?;
        Ok(self.store.import_document(tree.document())?)
    }

    /// Opens a skeleton document reconstructed from the profile.
    pub fn populate(&mut self, start: Option<&str>) -> Result<&DocumentTree, XProfileError> {
        let tree = DocumentTree::from_schema(&self.store, start, self.config.tree_config())?;
        Ok(&*self.tree.insert(tree))
    }

    // --- Editing ---

    pub fn insert(
        &mut self,
        name: &str,
        at: Option<usize>,
        placement: Placement,
    ) -> Result<TreeNodeId, XProfileError> {
        let tree = self.tree.as_mut().ok_or(XProfileError::NoDocument)?;
        Ok(tree.insert(&self.store, name, at, placement)?)
    }

    pub fn remove(&mut self, id: TreeNodeId) -> Result<(), XProfileError> {
        Ok(self.open_tree()?.remove(id)?)
    }

    /// Moves a node and teaches the profile the new parent/child relationship.
    pub fn move_node(
        &mut self,
        id: TreeNodeId,
        new_parent: Option<TreeNodeId>,
        position: usize,
    ) -> Result<(), XProfileError> {
        let tree = self.tree.as_mut().ok_or(XProfileError::NoDocument)?;
        Ok(tree.move_node(&self.store, id, new_parent, position)?)
    }

    pub fn comment_out(&mut self, indices: &[usize]) -> Result<NodeId, XProfileError> {
        Ok(self.open_tree()?.comment_out(indices)?)
    }

    pub fn uncomment(&mut self, comment: NodeId) -> Result<Vec<TreeNodeId>, XProfileError> {
        Ok(self.open_tree()?.uncomment(comment)?)
    }

    /// Removes a document type from the profile.
    pub fn remove_root(&mut self, root: &str) -> Result<usize, XProfileError> {
        Ok(self.store.remove_root_element(root)?)
    }
}
