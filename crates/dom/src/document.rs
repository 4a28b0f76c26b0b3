//! Arena-based, mutable XML document.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Removing a
//! node only retires its slot, so handles held elsewhere never alias a
//! different node after an edit.

use crate::error::DomError;
use xprofile_types::NodeId;

/// A single attribute, kept in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The payload of an element node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementData {
    /// Qualified name as written in the source, e.g. `svg:rect`.
    pub name: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The invisible parent of the document element and of prolog comments.
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, value: String },
}

/// Markup that precedes the document element and is not part of the node tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prolog {
    /// The raw `<?xml ...?>` declaration, if the source had one.
    pub declaration: Option<String>,
    /// The raw `<!DOCTYPE ...>` declaration, if the source had one.
    pub doctype: Option<String>,
}

#[derive(Debug, Clone)]
struct NodeSlot {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    live: bool,
}

#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<NodeSlot>,
    pub prolog: Prolog,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document containing only the document node.
    pub fn new() -> Self {
        Self {
            slots: vec![NodeSlot {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                live: true,
            }],
            prolog: Prolog::default(),
        }
    }

    /// The document node. It is never removed.
    pub fn document_node(&self) -> NodeId {
        NodeId::new(0)
    }

    /// The first top-level element, if any.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.document_node()).next()
    }

    /// Number of live nodes, the document node included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.live).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].children.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.live)
    }

    fn slot(&self, id: NodeId) -> Result<&NodeSlot, DomError> {
        self.slots
            .get(id.index())
            .filter(|s| s.live)
            .ok_or(DomError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut NodeSlot, DomError> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.live)
            .ok_or(DomError::UnknownNode(id))
    }

    // --- Reading ---

    pub fn kind(&self, id: NodeId) -> Result<&NodeKind, DomError> {
        Ok(&self.slot(id)?.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Ok(NodeKind::Element(_)))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Ok(NodeKind::Comment(_)))
    }

    pub fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        match self.kind(id)? {
            NodeKind::Element(data) => Ok(data),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.slot_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// The qualified name of an element, `None` for any other node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|e| e.name.as_str())
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|e| e.attributes.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn comment_text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Ok(NodeKind::Comment(text)) => Some(text),
            _ => None,
        }
    }

    /// Concatenated content of the direct text children of `id`.
    pub fn text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|c| match self.kind(*c) {
                Ok(NodeKind::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).ok().and_then(|s| s.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    /// Position of `id` among all children of its parent.
    pub fn child_position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let pos = self.child_position(id)?;
        pos.checked_sub(1).map(|p| self.children(parent)[p])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let pos = self.child_position(id)?;
        self.children(parent).get(pos + 1).copied()
    }

    /// Ancestors of `id`, nearest first, excluding the document node.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == self.document_node() {
                break;
            }
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Nesting depth; top-level nodes are at depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// `id` and every node below it, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// True if `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).contains(&ancestor)
    }

    /// Name of the top-level element that contains `id`.
    pub fn root_name_of(&self, id: NodeId) -> Option<&str> {
        let top = self.ancestors(id).last().copied().unwrap_or(id);
        self.name(top)
    }

    /// Slash-separated element names from the top-level element down to `id`.
    pub fn element_path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .iter()
            .rev()
            .filter_map(|a| self.name(*a))
            .collect();
        if let Some(name) = self.name(id) {
            names.push(name);
        }
        names.join("/")
    }

    // --- Creation ---

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.slots.len());
        self.slots.push(NodeSlot {
            kind,
            parent: None,
            children: Vec::new(),
            live: true,
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: &str) -> Result<NodeId, DomError> {
        if !is_valid_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        Ok(self.alloc(NodeKind::Element(ElementData {
            name: name.to_string(),
            attributes: Vec::new(),
        })))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment(text.to_string()))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_processing_instruction(&mut self, target: &str, value: &str) -> NodeId {
        self.alloc(NodeKind::ProcessingInstruction {
            target: target.to_string(),
            value: value.to_string(),
        })
    }

    /// Deep-copies `node` from `other` into this document, returning the
    /// detached copy.
    pub fn import_subtree(&mut self, other: &Document, node: NodeId) -> Result<NodeId, DomError> {
        let copy = self.alloc(other.kind(node)?.clone());
        for child in other.children(node) {
            let child_copy = self.import_subtree(other, *child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    // --- Attributes ---

    /// Sets an attribute, keeping its original position if it already exists.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if !is_valid_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => element.attributes.push(Attribute::new(name, value)),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let element = self.element_mut(id)?;
        let pos = element.attributes.iter().position(|a| a.name == name);
        Ok(pos.map(|p| element.attributes.remove(p).value))
    }

    // --- Structure ---

    /// Appends `child` as the last child of `parent`, detaching it first if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let len = self.detached_len(parent, child)?;
        self.insert_child(parent, len, child)
    }

    // Child count of `parent` as it will be once `child` has been detached.
    fn detached_len(&self, parent: NodeId, child: NodeId) -> Result<usize, DomError> {
        let children = &self.slot(parent)?.children;
        let already_there = children.contains(&child);
        Ok(children.len() - usize::from(already_there))
    }

    /// Inserts `child` at `position` among the children of `parent`.
    ///
    /// If `child` is already attached somewhere it is moved; `position` is
    /// interpreted after it has been detached.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        position: usize,
        child: NodeId,
    ) -> Result<(), DomError> {
        self.slot(child)?;
        if child == self.document_node() || self.is_ancestor_or_self(child, parent) {
            return Err(DomError::CycleDetected { node: child });
        }
        let len = self.detached_len(parent, child)?;
        if position > len {
            return Err(DomError::InvalidPosition {
                parent,
                position,
                len,
            });
        }
        self.detach(child)?;
        self.slot_mut(parent)?.children.insert(position, child);
        self.slot_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlinks `id` from its parent. The node and its subtree stay alive.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        if let Some(parent) = self.slot(id)?.parent {
            self.slot_mut(parent)?.children.retain(|c| *c != id);
            self.slot_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Detaches `id` and retires it together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.document_node() {
            return Err(DomError::CycleDetected { node: id });
        }
        self.detach(id)?;
        for node in self.descendants(id) {
            if let Some(slot) = self.slots.get_mut(node.index()) {
                slot.live = false;
                slot.children.clear();
                slot.parent = None;
            }
        }
        Ok(())
    }
}

/// Accepts names of the form `prefix:local` made of XML name characters.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}
