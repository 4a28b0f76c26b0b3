//! Structural edits.
//!
//! Each operation validates its arguments before touching the document, so a
//! rejected edit leaves both document and tree unchanged. Accepted edits are
//! applied to the document and the tree is re-synchronized from it.

use crate::error::TreeError;
use crate::node::{Notify, Placement, TreeEvent};
use crate::tree::DocumentTree;
use xprofile_dom::{escape_markup, is_commented_markup, parse_fragment, unescape_markup};
use xprofile_traits::SchemaProvider;
use xprofile_types::{NodeId, TreeNodeId};

impl DocumentTree {
    /// The comment directly before `element`, if it is an annotation rather
    /// than commented-out markup.
    pub fn annotation_of(&self, element: NodeId) -> Option<NodeId> {
        let previous = self.doc.previous_sibling(element)?;
        let text = self.doc.comment_text(previous)?;
        (!is_commented_markup(text)).then_some(previous)
    }

    // Document position for inserting before `siblings[position]` (keeping its
    // annotation attached), or at the end when `position == siblings.len()`.
    fn document_position(
        &self,
        parent: NodeId,
        siblings: &[TreeNodeId],
        position: usize,
    ) -> Result<usize, TreeError> {
        let Some(anchor) = siblings.get(position) else {
            return Ok(self.doc.children(parent).len());
        };
        let anchor = self.node(*anchor)?.element;
        let at = self
            .doc
            .child_position(anchor)
            .ok_or(TreeError::UnknownNode(siblings[position]))?;
        Ok(match self.annotation_of(anchor) {
            Some(_) => at - 1,
            None => at,
        })
    }

    fn parent_element(&self, parent: Option<TreeNodeId>) -> Result<NodeId, TreeError> {
        match parent {
            Some(p) => Ok(self.node(p)?.element),
            None => Ok(self.doc.document_node()),
        }
    }

    /// Inserts a new element named `name`, pre-populated with every attribute
    /// the schema knows for it (with empty values).
    ///
    /// `at` is a position among the target parent's element children. When
    /// omitted, the element is appended (`Into`, `TopLevel`) or placed right
    /// after the reference node (`SiblingOf`).
    pub fn insert(
        &mut self,
        schema: &dyn SchemaProvider,
        name: &str,
        at: Option<usize>,
        placement: Placement,
    ) -> Result<TreeNodeId, TreeError> {
        let (parent, siblings, default_position) = match placement {
            Placement::Into(p) => {
                let children = self.node(p)?.children.clone();
                let len = children.len();
                (Some(p), children, len)
            }
            Placement::SiblingOf(s) => {
                let parent = self.node(s)?.parent;
                let siblings = self.siblings_of(s)?.to_vec();
                let after = self.sibling_position(s)? + 1;
                (parent, siblings, after)
            }
            Placement::TopLevel => (None, self.top.clone(), self.top.len()),
        };
        // Only an empty document takes a new top-level element; skeletons
        // built from several roots get theirs from `from_schema`.
        if parent.is_none() && !self.top.is_empty() {
            return Err(TreeError::SecondRoot(name.to_string()));
        }
        let position = at.unwrap_or(default_position);
        if position > siblings.len() {
            return Err(TreeError::InvalidIndex {
                index: position,
                len: siblings.len(),
            });
        }

        let (parent_name, root) = match parent {
            Some(p) => (
                self.name(p).unwrap_or_default().to_string(),
                self.root_name(p).unwrap_or_default().to_string(),
            ),
            None => (String::new(), name.to_string()),
        };
        let attributes = schema.attributes(name, &parent_name, &root)?;

        let parent_element = self.parent_element(parent)?;
        let dom_position = self.document_position(parent_element, &siblings, position)?;
        let element = self.doc.create_element(name)?;
        for attribute in &attributes {
            self.doc.set_attribute(element, attribute, "")?;
        }
        self.doc.insert_child(parent_element, dom_position, element)?;
        self.resync();

        let id = self
            .node_for_element(element)
            .ok_or(TreeError::Dom(xprofile_dom::DomError::UnknownNode(element)))?;
        log::debug!(
            "Inserted <{}> at index {} with {} attributes",
            name,
            self.node(id)?.index,
            attributes.len()
        );
        self.emit(Notify::Emit, TreeEvent::Inserted(id));
        Ok(id)
    }

    /// Removes a node and its subtree.
    ///
    /// An annotation comment directly before the element goes with it;
    /// commented-out markup in that position is kept.
    pub fn remove(&mut self, id: TreeNodeId) -> Result<(), TreeError> {
        let node = self.node(id)?;
        let (element, index) = (node.element, node.index);
        let name = self.name(id).unwrap_or_default().to_string();

        if let Some(comment) = self.annotation_of(element) {
            self.doc.remove(comment)?;
        }
        self.doc.remove(element)?;
        self.resync();

        log::debug!("Removed <{}> from index {}", name, index);
        self.emit(Notify::Emit, TreeEvent::Removed { name, index });
        Ok(())
    }

    /// Moves `id` to `position` among the element children of `new_parent`
    /// (`None` for the top level), carrying its annotation comment along.
    ///
    /// `position` is interpreted with `id` already taken out of its old place.
    /// The new parent/child relationship is recorded in `schema` first; if
    /// that fails the document is not touched.
    pub fn move_node(
        &mut self,
        schema: &dyn SchemaProvider,
        id: TreeNodeId,
        new_parent: Option<TreeNodeId>,
        position: usize,
    ) -> Result<(), TreeError> {
        let element = self.node(id)?.element;
        if let Some(p) = new_parent {
            self.node(p)?;
            if self.is_ancestor_or_self(id, p) {
                return Err(TreeError::InvalidMove(format!(
                    "{} cannot become a child of its own subtree",
                    self.doc.element_path(element)
                )));
            }
        }
        if new_parent.is_none() && self.node(id)?.parent.is_some() && !self.top.is_empty() {
            return Err(TreeError::SecondRoot(
                self.name(id).unwrap_or_default().to_string(),
            ));
        }
        let siblings: Vec<TreeNodeId> = match new_parent {
            Some(p) => self.node(p)?.children.clone(),
            None => self.top.clone(),
        }
        .into_iter()
        .filter(|s| *s != id)
        .collect();
        if position > siblings.len() {
            return Err(TreeError::InvalidIndex {
                index: position,
                len: siblings.len(),
            });
        }

        if let Some(p) = new_parent {
            let name = self.name(id).unwrap_or_default();
            let parent_name = self.name(p).unwrap_or_default();
            let root = self.root_name(p).unwrap_or_default();
            schema.add_element(name, parent_name, root)?;
        }

        let parent_element = self.parent_element(new_parent)?;
        let annotation = self.annotation_of(element);
        if let Some(comment) = annotation {
            self.doc.detach(comment)?;
        }
        self.doc.detach(element)?;
        let mut dom_position = self.document_position(parent_element, &siblings, position)?;
        if let Some(comment) = annotation {
            self.doc.insert_child(parent_element, dom_position, comment)?;
            dom_position += 1;
        }
        self.doc.insert_child(parent_element, dom_position, element)?;
        self.resync();

        self.emit(Notify::Emit, TreeEvent::Moved(id));
        Ok(())
    }

    /// Swaps `id` with its previous sibling.
    pub fn step_up(&mut self, schema: &dyn SchemaProvider, id: TreeNodeId) -> Result<(), TreeError> {
        let parent = self.node(id)?.parent;
        let position = self.sibling_position(id)?;
        if position == 0 {
            return Err(TreeError::InvalidMove("already the first child".to_string()));
        }
        self.move_node(schema, id, parent, position - 1)
    }

    /// Swaps `id` with its next sibling.
    pub fn step_down(&mut self, schema: &dyn SchemaProvider, id: TreeNodeId) -> Result<(), TreeError> {
        let parent = self.node(id)?.parent;
        let position = self.sibling_position(id)?;
        if position + 1 >= self.siblings_of(id)?.len() {
            return Err(TreeError::InvalidMove("already the last child".to_string()));
        }
        self.move_node(schema, id, parent, position + 1)
    }

    /// Resolves ascending flattening indices to the nodes they name, dropping
    /// nodes that lie inside another selected node's subtree.
    pub(crate) fn resolve_indices(&self, indices: &[usize]) -> Result<Vec<TreeNodeId>, TreeError> {
        if indices.is_empty() || indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TreeError::UnsortedIndices);
        }
        let selected = indices
            .iter()
            .map(|i| self.at_index(*i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(selected
            .iter()
            .copied()
            .filter(|id| {
                !selected
                    .iter()
                    .any(|other| other != id && self.is_ancestor_or_self(*other, *id))
            })
            .collect())
    }

    /// Replaces the nodes at `indices` with a single comment holding `text`.
    ///
    /// The comment is placed where the shallowest selected node was (the
    /// first one on ties). Returns the new comment's handle.
    pub fn replace_with_comment(&mut self, indices: &[usize], text: &str) -> Result<NodeId, TreeError> {
        if text.contains("--") || text.ends_with('-') {
            return Err(TreeError::InvalidComment(
                "comment text may not contain '--' or end with '-'".to_string(),
            ));
        }
        let targets = self.resolve_indices(indices)?;
        let shallowest = targets
            .iter()
            .copied()
            .min_by_key(|id| self.depth(*id))
            .ok_or(TreeError::UnsortedIndices)?;
        let anchor = self.node(shallowest)?.element;
        let parent = self
            .doc
            .parent(anchor)
            .ok_or(TreeError::UnknownNode(shallowest))?;
        let position = self
            .doc
            .child_position(anchor)
            .ok_or(TreeError::UnknownNode(shallowest))?;

        let comment = self.doc.create_comment(text);
        self.doc.insert_child(parent, position, comment)?;
        for target in &targets {
            let element = self.node(*target)?.element;
            self.doc.remove(element)?;
        }
        self.resync();

        log::debug!("Replaced {} nodes with comment {}", targets.len(), comment);
        self.emit(Notify::Emit, TreeEvent::Commented { comment });
        Ok(comment)
    }

    /// Comments out the nodes at `indices`, keeping their markup inside the
    /// comment so it can later be restored with [`uncomment`](Self::uncomment).
    pub fn comment_out(&mut self, indices: &[usize]) -> Result<NodeId, TreeError> {
        let targets = self.resolve_indices(indices)?;
        let mut markup = String::from("\n");
        for target in &targets {
            markup.push_str(&self.node_text(*target)?);
        }
        self.replace_with_comment(indices, &escape_markup(&markup))
    }

    /// Replaces a comment holding markup with the nodes it contains.
    pub fn uncomment(&mut self, comment: NodeId) -> Result<Vec<TreeNodeId>, TreeError> {
        let text = self
            .doc
            .comment_text(comment)
            .ok_or(TreeError::NotComment(comment))?
            .to_string();
        if !is_commented_markup(&text) {
            return Err(TreeError::InvalidComment(
                "comment does not contain markup".to_string(),
            ));
        }
        let parent = self
            .doc
            .parent(comment)
            .ok_or_else(|| TreeError::InvalidComment("comment is detached".to_string()))?;
        let mut position = self
            .doc
            .child_position(comment)
            .ok_or_else(|| TreeError::InvalidComment("comment is detached".to_string()))?;

        let fragment = parse_fragment(&unescape_markup(&text))?;
        let mut elements = Vec::new();
        for child in fragment.children(fragment.document_node()) {
            let copy = self.doc.import_subtree(&fragment, *child)?;
            self.doc.insert_child(parent, position, copy)?;
            position += 1;
            if self.doc.is_element(copy) {
                elements.push(copy);
            }
        }
        self.doc.remove(comment)?;
        self.resync();

        let restored: Vec<TreeNodeId> = elements
            .iter()
            .filter_map(|e| self.node_for_element(*e))
            .collect();
        self.emit(
            Notify::Emit,
            TreeEvent::Uncommented {
                restored: restored.clone(),
            },
        );
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use crate::{DocumentTree, Placement, TreeConfig, TreeError, TreeEvent};
    use xprofile_traits::{InMemorySchemaProvider, SchemaProvider};
    use xprofile_types::ElementRecord;

    fn tree(text: &str) -> DocumentTree {
        DocumentTree::parse(text, TreeConfig::default()).unwrap()
    }

    fn names(t: &DocumentTree) -> Vec<String> {
        t.flat()
            .iter()
            .map(|id| t.name(*id).unwrap().to_string())
            .collect()
    }

    fn schema() -> InMemorySchemaProvider {
        InMemorySchemaProvider::from_records([
            ElementRecord::attribute("server", "config", "config", "host", "a"),
            ElementRecord::attribute("server", "config", "config", "port", "80"),
        ])
    }

    #[test]
    fn test_insert_prepopulates_known_attributes() {
        let mut t = tree("<config><logging/></config>");
        let root = t.find_by_index(0).unwrap();
        let server = t
            .insert(&schema(), "server", Some(0), Placement::Into(root))
            .unwrap();
        assert_eq!(names(&t), vec!["config", "server", "logging"]);
        assert_eq!(t.node(server).unwrap().index(), 1);
        assert_eq!(
            t.text(),
            "<config>\n  <server host=\"\" port=\"\"/>\n  <logging/>\n</config>\n"
        );
        assert_eq!(t.take_events(), vec![TreeEvent::Inserted(server)]);
    }

    #[test]
    fn test_insert_as_sibling_goes_after_reference() {
        let mut t = tree("<a><b/><c/></a>");
        let b = t.find_by_index(1).unwrap();
        t.insert(&schema(), "x", None, Placement::SiblingOf(b)).unwrap();
        assert_eq!(names(&t), vec!["a", "b", "x", "c"]);
    }

    #[test]
    fn test_insert_before_keeps_annotation_with_its_element() {
        let mut t = tree("<a><!--about c--><c/></a>");
        let a = t.find_by_index(0).unwrap();
        t.insert(&schema(), "x", Some(0), Placement::Into(a)).unwrap();
        assert_eq!(t.text(), "<a>\n  <x/>\n  <!--about c-->\n  <c/>\n</a>\n");
    }

    #[test]
    fn test_insert_rejects_bad_position_without_changes() {
        let mut t = tree("<a><b/></a>");
        let a = t.find_by_index(0).unwrap();
        let before = t.text();
        let err = t
            .insert(&schema(), "x", Some(5), Placement::Into(a))
            .unwrap_err();
        assert_eq!(err, TreeError::InvalidIndex { index: 5, len: 1 });
        assert_eq!(t.text(), before);
    }

    #[test]
    fn test_remove_drops_annotation_but_keeps_commented_markup() {
        let mut t = tree("<a><!-- note --><b/><!--<old/>--><c/></a>");
        let b = t.find_by_index(1).unwrap();
        t.remove(b).unwrap();
        let c = t.find_by_index(1).unwrap();
        t.remove(c).unwrap();
        assert_eq!(t.text(), "<a>\n  <!--<old/>-->\n</a>\n");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_indices_stay_dense_after_remove() {
        let mut t = tree("<a><b><c/></b><d/><e/></a>");
        let b = t.find_by_index(1).unwrap();
        t.remove(b).unwrap();
        assert_eq!(names(&t), vec!["a", "d", "e"]);
        for (i, id) in t.flat().iter().enumerate() {
            assert_eq!(t.node(*id).unwrap().index(), i);
        }
        assert!(!t.contains(b));
    }

    #[test]
    fn test_move_teaches_schema_and_carries_annotation() {
        let schema = schema();
        let mut t = tree("<config><!--primary--><server/><group/></config>");
        let server = t.find_by_index(1).unwrap();
        let group = t.find_by_index(2).unwrap();
        t.move_node(&schema, server, Some(group), 0).unwrap();
        assert_eq!(
            t.text(),
            "<config>\n  <group>\n    <!--primary-->\n    <server/>\n  </group>\n</config>\n"
        );
        assert_eq!(t.node(server).unwrap().parent(), Some(group));
        assert_eq!(schema.children("group", "config", "config").unwrap(), vec!["server"]);
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let mut t = tree("<a><b><c/></b></a>");
        let b = t.find_by_index(1).unwrap();
        let c = t.find_by_index(2).unwrap();
        let before = t.text();
        assert!(matches!(
            t.move_node(&schema(), b, Some(c), 0),
            Err(TreeError::InvalidMove(_))
        ));
        assert!(matches!(
            t.move_node(&schema(), b, Some(b), 0),
            Err(TreeError::InvalidMove(_))
        ));
        assert_eq!(t.text(), before);
    }

    #[test]
    fn test_step_up_and_down() {
        let schema = schema();
        let mut t = tree("<a><b/><c/><d/></a>");
        let d = t.find_by_index(3).unwrap();
        t.step_up(&schema, d).unwrap();
        assert_eq!(names(&t), vec!["a", "b", "d", "c"]);
        let b = t.find_by_index(1).unwrap();
        t.step_down(&schema, b).unwrap();
        assert_eq!(names(&t), vec!["a", "d", "b", "c"]);
        let c = t.find_by_index(3).unwrap();
        assert!(t.step_down(&schema, c).is_err());
        assert!(t.step_up(&schema, t.find_by_index(1).unwrap()).is_err());
    }

    #[test]
    fn test_replace_with_comment_uses_shallowest_position() {
        let mut t = tree("<a><b><c/></b><d/></a>");
        let comment = t.replace_with_comment(&[2, 3], " gone ").unwrap();
        assert_eq!(t.text(), "<a>\n  <b/>\n  <!-- gone -->\n</a>\n");
        assert_eq!(t.document().comment_text(comment), Some(" gone "));
        assert_eq!(names(&t), vec!["a", "b"]);
    }

    #[test]
    fn test_replace_with_comment_ties_take_first_position() {
        let mut t = tree("<a><x/><b/><c/></a>");
        t.replace_with_comment(&[2, 3], "bc").unwrap();
        assert_eq!(t.text(), "<a>\n  <x/>\n  <!--bc-->\n</a>\n");
    }

    #[test]
    fn test_replace_with_comment_validates_indices() {
        let mut t = tree("<a><b/><c/></a>");
        assert_eq!(t.replace_with_comment(&[], "x"), Err(TreeError::UnsortedIndices));
        assert_eq!(t.replace_with_comment(&[2, 1], "x"), Err(TreeError::UnsortedIndices));
        assert_eq!(t.replace_with_comment(&[1, 1], "x"), Err(TreeError::UnsortedIndices));
        assert_eq!(
            t.replace_with_comment(&[1, 3], "x"),
            Err(TreeError::InvalidIndex { index: 3, len: 3 })
        );
        assert!(matches!(
            t.replace_with_comment(&[1], "a--b"),
            Err(TreeError::InvalidComment(_))
        ));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_comment_out_then_uncomment_restores_markup() {
        let mut t = tree(r#"<a><b k="1"><c/></b><d/></a>"#);
        let original = t.text();
        let comment = t.comment_out(&[1, 2]).unwrap();
        assert_eq!(names(&t), vec!["a", "d"]);
        assert!(xprofile_dom::is_commented_markup(
            t.document().comment_text(comment).unwrap()
        ));

        let restored = t.uncomment(comment).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(t.name(restored[0]), Some("b"));
        assert_eq!(t.text(), original);
    }

    #[test]
    fn test_second_document_element_is_rejected() {
        let mut t = tree("<a><b/></a>");
        let a = t.find_by_index(0).unwrap();
        let b = t.find_by_index(1).unwrap();
        assert_eq!(
            t.insert(&schema(), "x", None, Placement::TopLevel),
            Err(TreeError::SecondRoot("x".to_string()))
        );
        assert_eq!(
            t.insert(&schema(), "x", None, Placement::SiblingOf(a)),
            Err(TreeError::SecondRoot("x".to_string()))
        );
        assert_eq!(
            t.move_node(&schema(), b, None, 0),
            Err(TreeError::SecondRoot("b".to_string()))
        );
        assert_eq!(names(&t), vec!["a", "b"]);

        let mut empty = DocumentTree::new(xprofile_dom::Document::new(), TreeConfig::default());
        empty.insert(&schema(), "root", None, Placement::TopLevel).unwrap();
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_comment_out_keeps_nested_comments() {
        let mut t = tree(r#"<a><b x="1--2"><!--note--><c/></b><d/></a>"#);
        let original = t.text();
        let comment = t.comment_out(&[1]).unwrap();
        assert_eq!(names(&t), vec!["a", "d"]);
        let text = t.document().comment_text(comment).unwrap();
        assert!(!text.contains("--"));

        let restored = t.uncomment(comment).unwrap();
        assert_eq!(t.name(restored[0]), Some("b"));
        assert_eq!(t.text(), original);
    }

    #[test]
    fn test_disabled_markup_is_not_an_annotation() {
        let mut t = tree(r#"<a><b><!--note--><c/></b><d/></a>"#);
        let comment = t.comment_out(&[1]).unwrap();
        t.remove(t.find_by_index(1).unwrap()).unwrap();
        assert!(t.document().comment_text(comment).is_some());
    }

    #[test]
    fn test_uncomment_rejects_annotations() {
        let mut t = tree("<a><!-- just a note --><b/></a>");
        let comment = t.document().children(t.node(t.find_by_index(0).unwrap()).unwrap().element())[0];
        assert!(matches!(t.uncomment(comment), Err(TreeError::InvalidComment(_))));
        let element = t.node(t.find_by_index(1).unwrap()).unwrap().element();
        assert_eq!(t.uncomment(element), Err(TreeError::NotComment(element)));
    }
}
