//! Checkbox-style inclusion state.
//!
//! Including a node includes every ancestor; excluding a node excludes every
//! descendant, so an included node never sits below an excluded one.

use crate::error::TreeError;
use crate::node::{Notify, TreeEvent};
use crate::tree::DocumentTree;
use xprofile_types::TreeNodeId;

impl DocumentTree {
    fn set_excluded(&mut self, id: TreeNodeId, excluded: bool, notify: Notify) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if node.excluded == excluded {
            return Ok(());
        }
        node.excluded = excluded;
        self.emit(notify, TreeEvent::ExclusionChanged { node: id, excluded });
        Ok(())
    }

    /// Includes `id` and every ancestor up to the top level.
    pub fn include_up(&mut self, id: TreeNodeId, notify: Notify) -> Result<(), TreeError> {
        let mut current = Some(id);
        while let Some(c) = current {
            self.set_excluded(c, false, notify)?;
            current = self.node(c)?.parent;
        }
        Ok(())
    }

    /// Excludes `id` and its whole subtree.
    pub fn exclude_down(&mut self, id: TreeNodeId, notify: Notify) -> Result<(), TreeError> {
        self.node(id)?;
        for node in self.descendants(id) {
            self.set_excluded(node, true, notify)?;
        }
        Ok(())
    }

    /// Applies a checkbox toggle.
    pub fn set_checked(&mut self, id: TreeNodeId, checked: bool, notify: Notify) -> Result<(), TreeError> {
        if checked {
            self.include_up(id, notify)
        } else {
            self.exclude_down(id, notify)
        }
    }

    pub fn set_all_excluded(&mut self, excluded: bool, notify: Notify) {
        for id in self.flat.clone() {
            // Every id in `flat` is live.
            let _ = self.set_excluded(id, excluded, notify);
        }
    }

    /// True if `id` or any of its ancestors is excluded.
    pub fn is_effectively_excluded(&self, id: TreeNodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.node(c) {
                Ok(node) if node.excluded => return true,
                Ok(node) => current = node.parent,
                Err(_) => return false,
            }
        }
        false
    }
}
