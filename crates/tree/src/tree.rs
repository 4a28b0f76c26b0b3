//! The document tree: one [`TreeNode`] per element, addressed by stable
//! [`TreeNodeId`]s and by a preorder flattening index.
//!
//! Every structural edit is applied to the [`Document`] first. The tree is
//! then re-synchronized from it with [`DocumentTree::resync`], which keeps the
//! identity and state of surviving nodes and recomputes every index.

use crate::error::TreeError;
use crate::node::{Notify, TreeConfig, TreeEvent, TreeNode};
use std::collections::HashMap;
use xprofile_dom::{Document, SerializeOptions, node_to_string, start_tag, to_string};
use xprofile_types::{NodeId, TreeNodeId};

#[derive(Debug, Clone)]
pub struct DocumentTree {
    pub(crate) doc: Document,
    pub(crate) nodes: Vec<Option<TreeNode>>,
    pub(crate) top: Vec<TreeNodeId>,
    pub(crate) flat: Vec<TreeNodeId>,
    pub(crate) by_element: HashMap<NodeId, TreeNodeId>,
    pub(crate) config: TreeConfig,
    pub(crate) events: Vec<TreeEvent>,
}

impl DocumentTree {
    /// Builds a tree over an existing document, taking ownership of it.
    pub fn new(doc: Document, config: TreeConfig) -> Self {
        let mut tree = Self {
            doc,
            nodes: Vec::new(),
            top: Vec::new(),
            flat: Vec::new(),
            by_element: HashMap::new(),
            config,
            events: Vec::new(),
        };
        tree.resync();
        log::debug!("Built document tree with {} nodes", tree.len());
        tree
    }

    /// Parses `text` and builds a tree over the result.
    pub fn parse(text: &str, config: TreeConfig) -> Result<Self, TreeError> {
        Ok(Self::new(Document::parse(text)?, config))
    }

    // --- Synchronization ---

    /// Rebuilds parent/child links and indices from the document.
    ///
    /// Elements that already had a tree node keep it (and its exclusion and
    /// snippet state); elements without one get a fresh node that inherits
    /// its parent's exclusion, returned in preorder. Nodes whose element left
    /// the document are dropped.
    pub(crate) fn resync(&mut self) -> Vec<TreeNodeId> {
        let mut created = Vec::new();
        let mut flat = Vec::new();
        let document_node = self.doc.document_node();
        let top_elements: Vec<NodeId> = self.doc.element_children(document_node).collect();
        let top = top_elements
            .into_iter()
            .map(|element| self.attach(element, None, &mut created, &mut flat))
            .collect();

        let mut reachable = vec![false; self.nodes.len()];
        for id in &flat {
            reachable[id.index()] = true;
        }
        for (slot, live) in reachable.into_iter().enumerate() {
            if live {
                continue;
            }
            if let Some(node) = self.nodes[slot].take() {
                self.by_element.remove(&node.element);
            }
        }

        for id in &created {
            let parent_excluded = self.nodes[id.index()]
                .as_ref()
                .and_then(|n| n.parent)
                .and_then(|p| self.nodes[p.index()].as_ref())
                .is_some_and(|p| p.excluded);
            if let Some(node) = self.nodes[id.index()].as_mut() {
                node.excluded = parent_excluded;
                node.included_attributes = self
                    .doc
                    .attributes(node.element)
                    .iter()
                    .map(|a| a.name.clone())
                    .collect();
            }
        }

        self.top = top;
        self.flat = flat;
        created
    }

    fn attach(
        &mut self,
        element: NodeId,
        parent: Option<TreeNodeId>,
        created: &mut Vec<TreeNodeId>,
        flat: &mut Vec<TreeNodeId>,
    ) -> TreeNodeId {
        let existing = self
            .by_element
            .get(&element)
            .copied()
            .filter(|id| self.nodes[id.index()].is_some());
        let id = match existing {
            Some(id) => id,
            None => {
                let id = TreeNodeId::new(self.nodes.len());
                self.nodes.push(Some(TreeNode::new(element, parent)));
                self.by_element.insert(element, id);
                created.push(id);
                id
            }
        };

        let index = flat.len();
        flat.push(id);
        let child_elements: Vec<NodeId> = self.doc.element_children(element).collect();
        let children = child_elements
            .into_iter()
            .map(|child| self.attach(child, Some(id), created, flat))
            .collect();

        if let Some(node) = self.nodes[id.index()].as_mut() {
            node.parent = parent;
            node.index = index;
            node.children = children;
        }
        id
    }

    pub(crate) fn emit(&mut self, notify: Notify, event: TreeEvent) {
        if notify == Notify::Emit {
            self.events.push(event);
        }
    }

    /// Drains the pending change notifications.
    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Lookup ---

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn config(&self) -> TreeConfig {
        self.config
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn top_level(&self) -> &[TreeNodeId] {
        &self.top
    }

    /// All nodes in flattening-index order.
    pub fn flat(&self) -> &[TreeNodeId] {
        &self.flat
    }

    pub fn node(&self, id: TreeNodeId) -> Result<&TreeNode, TreeError> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: TreeNodeId) -> Result<&mut TreeNode, TreeError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn contains(&self, id: TreeNodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn find_by_index(&self, index: usize) -> Option<TreeNodeId> {
        self.flat.get(index).copied()
    }

    pub(crate) fn at_index(&self, index: usize) -> Result<TreeNodeId, TreeError> {
        self.find_by_index(index).ok_or(TreeError::InvalidIndex {
            index,
            len: self.len(),
        })
    }

    pub fn node_for_element(&self, element: NodeId) -> Option<TreeNodeId> {
        self.by_element.get(&element).copied()
    }

    pub fn name(&self, id: TreeNodeId) -> Option<&str> {
        self.node(id).ok().and_then(|n| self.doc.name(n.element))
    }

    /// Name of the top-level element above `id`.
    pub fn root_name(&self, id: TreeNodeId) -> Option<&str> {
        self.node(id).ok().and_then(|n| self.doc.root_name_of(n.element))
    }

    /// Name of the parent element, or `""` for a top-level node.
    pub fn parent_name(&self, id: TreeNodeId) -> &str {
        self.node(id)
            .ok()
            .and_then(|n| n.parent)
            .and_then(|p| self.name(p))
            .unwrap_or("")
    }

    pub fn depth(&self, id: TreeNodeId) -> usize {
        let mut depth = 0;
        let mut current = self.node(id).ok().and_then(|n| n.parent);
        while let Some(p) = current {
            depth += 1;
            current = self.node(p).ok().and_then(|n| n.parent);
        }
        depth
    }

    /// `id` and all nodes below it, in preorder.
    pub fn descendants(&self, id: TreeNodeId) -> Vec<TreeNodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Ok(node) = self.node(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn is_ancestor_or_self(&self, ancestor: TreeNodeId, id: TreeNodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.node(c).ok().and_then(|n| n.parent);
        }
        false
    }

    /// Position of `id` among its parent's element children.
    pub fn sibling_position(&self, id: TreeNodeId) -> Result<usize, TreeError> {
        let siblings = self.siblings_of(id)?;
        siblings
            .iter()
            .position(|s| *s == id)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn siblings_of(&self, id: TreeNodeId) -> Result<&[TreeNodeId], TreeError> {
        match self.node(id)?.parent {
            Some(parent) => Ok(&self.node(parent)?.children),
            None => Ok(&self.top),
        }
    }

    // --- Presentation ---

    pub(crate) fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            indent: self.config.indent,
        }
    }

    /// The label shown for a node: its start tag in verbose mode, otherwise
    /// just the element name.
    pub fn display_text(&self, id: TreeNodeId) -> String {
        let Ok(node) = self.node(id) else {
            return String::new();
        };
        if self.config.verbose {
            start_tag(&self.doc, node.element).unwrap_or_default()
        } else {
            self.doc.name(node.element).unwrap_or_default().to_string()
        }
    }

    /// One indented line per node, prefixed by its flattening index and
    /// marked when excluded.
    pub fn outline(&self) -> Vec<String> {
        self.flat
            .iter()
            .map(|id| {
                let marker = match self.node(*id) {
                    Ok(node) if node.excluded => "[ ]",
                    _ => "[x]",
                };
                format!(
                    "{}{} {} {}",
                    "  ".repeat(self.depth(*id)),
                    marker,
                    self.node(*id).map(|n| n.index).unwrap_or_default(),
                    self.display_text(*id)
                )
            })
            .collect()
    }

    /// The whole document rendered as text.
    pub fn text(&self) -> String {
        to_string(&self.doc, self.serialize_options())
    }

    /// The subtree of `id` rendered as text.
    pub fn node_text(&self, id: TreeNodeId) -> Result<String, TreeError> {
        let element = self.node(id)?.element;
        Ok(node_to_string(&self.doc, element, self.serialize_options()))
    }

    // --- Values ---

    /// Sets an attribute value on the node's element.
    ///
    /// A newly added attribute is included in snippet output by default.
    pub fn set_attribute_value(
        &mut self,
        id: TreeNodeId,
        attribute: &str,
        value: &str,
        notify: Notify,
    ) -> Result<(), TreeError> {
        let element = self.node(id)?.element;
        let existed = self.doc.attribute(element, attribute).is_some();
        self.doc.set_attribute(element, attribute, value)?;
        if !existed {
            self.node_mut(id)?
                .included_attributes
                .insert(attribute.to_string());
        }
        self.emit(
            notify,
            TreeEvent::ValueChanged {
                node: id,
                attribute: attribute.to_string(),
            },
        );
        Ok(())
    }
}
