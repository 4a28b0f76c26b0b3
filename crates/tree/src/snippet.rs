//! Snippet generation: rendering a subtree repeatedly, filtered by inclusion
//! state, with selected attribute values advancing between copies.

use crate::error::TreeError;
use crate::tree::DocumentTree;
use xprofile_dom::{Document, NodeKind, to_string};
use xprofile_types::{NodeId, TreeNodeId};

/// Advances the trailing decimal number of `value`, keeping its width when
/// possible (`item9` → `item10`, `007` → `008`). A value without a trailing
/// number gets `1` appended.
pub fn increment_value(value: &str) -> String {
    let prefix = value.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &value[prefix.len()..];
    if digits.is_empty() {
        return format!("{}1", value);
    }

    let mut bytes: Vec<u8> = digits.bytes().collect();
    let mut carry = true;
    for b in bytes.iter_mut().rev() {
        if *b == b'9' {
            *b = b'0';
        } else {
            *b += 1;
            carry = false;
            break;
        }
    }
    if carry {
        bytes.insert(0, b'1');
    }
    let number: String = bytes.iter().map(|b| char::from(*b)).collect();
    format!("{}{}", prefix, number)
}

impl DocumentTree {
    /// Chooses whether `attribute` is written into generated snippets.
    pub fn set_attribute_included(
        &mut self,
        id: TreeNodeId,
        attribute: &str,
        included: bool,
    ) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if included {
            node.included_attributes.insert(attribute.to_string());
        } else {
            node.included_attributes.remove(attribute);
        }
        Ok(())
    }

    /// Chooses whether `attribute` advances between generated copies.
    pub fn set_attribute_incremented(
        &mut self,
        id: TreeNodeId,
        attribute: &str,
        incremented: bool,
    ) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if incremented {
            node.incremented_attributes.insert(attribute.to_string());
        } else {
            node.incremented_attributes.remove(attribute);
        }
        Ok(())
    }

    /// Snapshots the current attribute values of the subtree at `id`.
    pub fn fix_values(&mut self, id: TreeNodeId) -> Result<(), TreeError> {
        self.node(id)?;
        for node in self.descendants(id) {
            let element = self.node(node)?.element;
            let values = self.doc.attributes(element).to_vec();
            self.node_mut(node)?.fixed_values = values;
        }
        Ok(())
    }

    /// Writes the values captured by [`fix_values`](Self::fix_values) back
    /// into the document.
    pub fn restore_fixed_values(&mut self, id: TreeNodeId) -> Result<(), TreeError> {
        self.node(id)?;
        for node in self.descendants(id) {
            let node = self.node(node)?;
            let (element, values) = (node.element, node.fixed_values.clone());
            for attr in values {
                self.doc.set_attribute(element, &attr.name, &attr.value)?;
            }
        }
        Ok(())
    }

    /// Advances every incremented attribute in the included part of the subtree.
    pub fn increment_values(&mut self, id: TreeNodeId) -> Result<(), TreeError> {
        self.node(id)?;
        for node in self.descendants(id) {
            let node = self.node(node)?;
            if node.excluded {
                continue;
            }
            let element = node.element;
            let updates: Vec<(String, String)> = node
                .incremented_attributes
                .iter()
                .filter_map(|name| {
                    self.doc
                        .attribute(element, name)
                        .map(|value| (name.clone(), increment_value(value)))
                })
                .collect();
            for (name, value) in updates {
                self.doc.set_attribute(element, &name, &value)?;
            }
        }
        Ok(())
    }

    /// Renders `copies` copies of the subtree at `id`, advancing incremented
    /// attributes after each one.
    ///
    /// The advanced values stay in the document, so a later call continues
    /// the sequence. Excluded nodes and attributes not marked as included are
    /// left out of the output.
    pub fn generate_snippet(&mut self, id: TreeNodeId, copies: usize) -> Result<String, TreeError> {
        self.node(id)?;
        let mut out = String::new();
        for _ in 0..copies {
            let mut scratch = Document::new();
            if let Some(copy) = self.copy_included(&mut scratch, id)? {
                let top = scratch.document_node();
                scratch.append_child(top, copy)?;
            }
            out.push_str(&to_string(&scratch, self.serialize_options()));
            self.increment_values(id)?;
        }
        log::debug!("Generated {} copies of {}", copies, id);
        Ok(out)
    }

    fn copy_included(&self, scratch: &mut Document, id: TreeNodeId) -> Result<Option<NodeId>, TreeError> {
        let node = self.node(id)?;
        if node.excluded {
            return Ok(None);
        }
        let element = node.element;
        let copy = scratch.create_element(self.doc.element(element)?.name.as_str())?;
        for attr in self.doc.attributes(element) {
            if node.included_attributes.contains(&attr.name) {
                scratch.set_attribute(copy, &attr.name, &attr.value)?;
            }
        }

        for child in self.doc.children(element) {
            let child_copy = match self.doc.kind(*child)? {
                NodeKind::Element(_) => match self.node_for_element(*child) {
                    Some(tree_child) => self.copy_included(scratch, tree_child)?,
                    None => None,
                },
                NodeKind::Text(text) => Some(scratch.create_text(text)),
                _ => None,
            };
            if let Some(child_copy) = child_copy {
                scratch.append_child(copy, child_copy)?;
            }
        }
        Ok(Some(copy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Notify, TreeConfig};

    #[test]
    fn test_increment_value() {
        assert_eq!(increment_value("item9"), "item10");
        assert_eq!(increment_value("007"), "008");
        assert_eq!(increment_value("099"), "100");
        assert_eq!(increment_value("999"), "1000");
        assert_eq!(increment_value("a1b2"), "a1b3");
        assert_eq!(increment_value("name"), "name1");
        assert_eq!(increment_value(""), "1");
    }

    fn tree(text: &str) -> DocumentTree {
        DocumentTree::parse(text, TreeConfig::default()).unwrap()
    }

    #[test]
    fn test_copies_advance_and_continue() {
        let mut t = tree(r#"<list><item id="item1" kind="x"/></list>"#);
        let item = t.find_by_index(1).unwrap();
        t.set_attribute_incremented(item, "id", true).unwrap();
        assert_eq!(
            t.generate_snippet(item, 3).unwrap(),
            concat!(
                "<item id=\"item1\" kind=\"x\"/>\n",
                "<item id=\"item2\" kind=\"x\"/>\n",
                "<item id=\"item3\" kind=\"x\"/>\n",
            )
        );
        assert_eq!(
            t.generate_snippet(item, 1).unwrap(),
            "<item id=\"item4\" kind=\"x\"/>\n"
        );
    }

    #[test]
    fn test_exclusions_filter_output() {
        let mut t = tree(r#"<list><item id="1" secret="s"><name>n</name><debug/></item></list>"#);
        let item = t.find_by_index(1).unwrap();
        let debug = t.find_by_index(3).unwrap();
        t.exclude_down(debug, Notify::Suppress).unwrap();
        t.set_attribute_included(item, "secret", false).unwrap();
        assert_eq!(
            t.generate_snippet(item, 1).unwrap(),
            "<item id=\"1\">\n  <name>n</name>\n</item>\n"
        );
        assert_eq!(t.generate_snippet(debug, 2).unwrap(), "");
    }

    #[test]
    fn test_fixed_values_can_be_restored() {
        let mut t = tree(r#"<list><item n="07"><sub n="a"/></item></list>"#);
        let item = t.find_by_index(1).unwrap();
        let sub = t.find_by_index(2).unwrap();
        t.set_attribute_incremented(item, "n", true).unwrap();
        t.set_attribute_incremented(sub, "n", true).unwrap();
        t.fix_values(item).unwrap();

        t.generate_snippet(item, 2).unwrap();
        let element = t.node(sub).unwrap().element();
        assert_eq!(t.document().attribute(element, "n"), Some("a2"));

        t.restore_fixed_values(item).unwrap();
        assert_eq!(t.document().attribute(element, "n"), Some("a"));
        let element = t.node(item).unwrap().element();
        assert_eq!(t.document().attribute(element, "n"), Some("07"));
    }
}
