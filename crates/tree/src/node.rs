use std::collections::BTreeSet;
use xprofile_dom::Attribute;
use xprofile_types::{NodeId, TreeNodeId};

/// Display and rendering settings for a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Show full start tags instead of bare element names.
    pub verbose: bool,
    /// Spaces per nesting level when rendering text.
    pub indent: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            indent: 2,
        }
    }
}

/// Where a new element goes relative to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// As a child of the given node.
    Into(TreeNodeId),
    /// As a sibling of the given node, under the same parent.
    SiblingOf(TreeNodeId),
    /// As a new top-level element.
    TopLevel,
}

/// Whether a state change should be reported through the event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    #[default]
    Emit,
    Suppress,
}

/// Changes observers may want to react to, drained with
/// [`DocumentTree::take_events`](crate::DocumentTree::take_events).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Inserted(TreeNodeId),
    Removed { name: String, index: usize },
    Moved(TreeNodeId),
    Commented { comment: NodeId },
    Uncommented { restored: Vec<TreeNodeId> },
    ExclusionChanged { node: TreeNodeId, excluded: bool },
    ValueChanged { node: TreeNodeId, attribute: String },
}

/// One element of the document as seen by the tree.
///
/// The node holds a handle, never a copy: name, attributes and text are always
/// read from the owning document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub(crate) element: NodeId,
    pub(crate) parent: Option<TreeNodeId>,
    pub(crate) children: Vec<TreeNodeId>,
    pub(crate) index: usize,
    pub(crate) excluded: bool,
    pub(crate) included_attributes: BTreeSet<String>,
    pub(crate) incremented_attributes: BTreeSet<String>,
    pub(crate) fixed_values: Vec<Attribute>,
}

impl TreeNode {
    pub(crate) fn new(element: NodeId, parent: Option<TreeNodeId>) -> Self {
        Self {
            element,
            parent,
            children: Vec::new(),
            index: 0,
            excluded: false,
            included_attributes: BTreeSet::new(),
            incremented_attributes: BTreeSet::new(),
            fixed_values: Vec::new(),
        }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn parent(&self) -> Option<TreeNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[TreeNodeId] {
        &self.children
    }

    /// Preorder position of this node over the whole tree.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn included_attributes(&self) -> &BTreeSet<String> {
        &self.included_attributes
    }

    pub fn incremented_attributes(&self) -> &BTreeSet<String> {
        &self.incremented_attributes
    }

    pub fn fixed_values(&self) -> &[Attribute] {
        &self.fixed_values
    }
}
