//! Record extraction: flattens a parsed document into normalized element records.

use std::collections::VecDeque;
use xprofile_dom::Document;
use xprofile_types::{ElementRecord, NodeId};

/// The records of one document, together with its root element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub root: String,
    pub records: Vec<ElementRecord>,
}

/// Namespace declarations are markup plumbing, not schema attributes.
fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Walks every element below the document element breadth-first and emits one
/// record per attribute occurrence, or a single edge record for an element
/// without attributes.
///
/// Returns `None` for a document without a document element.
pub fn extract_records(doc: &Document) -> Option<Extraction> {
    let root_id = doc.document_element()?;
    let root = doc.name(root_id)?.to_string();
    let mut records = Vec::new();

    let mut queue: VecDeque<(NodeId, NodeId)> = doc
        .element_children(root_id)
        .map(|child| (child, root_id))
        .collect();

    while let Some((id, parent_id)) = queue.pop_front() {
        let (Some(element), Some(parent)) = (doc.name(id), doc.name(parent_id)) else {
            continue;
        };

        let mut emitted = false;
        for attr in doc.attributes(id) {
            if is_namespace_declaration(&attr.name) {
                continue;
            }
            records.push(ElementRecord::attribute(
                element,
                parent,
                root.as_str(),
                attr.name.as_str(),
                attr.value.as_str(),
            ));
            emitted = true;
        }
        if !emitted {
            records.push(ElementRecord::edge(element, parent, root.as_str()));
        }

        queue.extend(doc.element_children(id).map(|child| (child, id)));
    }

    log::trace!("Extracted {} records for <{}>", records.len(), root);
    Some(Extraction { root, records })
}
