//! Builds a [`Document`] from text using `roxmltree`.
//!
//! `roxmltree` does the well-formedness checking and entity expansion; this
//! module copies its read-only tree into the mutable arena, restoring the
//! qualified names and `xmlns` declarations the user wrote.

use crate::document::{Attribute, Document, Prolog};
use crate::error::DomError;
use xprofile_types::NodeId;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

impl Document {
    /// Parses a complete XML document.
    pub fn parse(text: &str) -> Result<Self, DomError> {
        parse(text)
    }
}

pub fn parse(text: &str) -> Result<Document, DomError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let source = roxmltree::Document::parse_with_options(text, options)?;

    let mut doc = Document::new();
    let root_start = source.root_element().range().start;
    doc.prolog = read_prolog(&text[..root_start]);

    let document_node = doc.document_node();
    for child in source.root().children() {
        copy_node(&mut doc, document_node, child)?;
    }
    log::debug!(
        "Parsed document <{}> with {} nodes",
        source.root_element().tag_name().name(),
        doc.len()
    );
    Ok(doc)
}

/// Copies `node` and its subtree under `parent`. Whitespace-only text is
/// dropped; the serializer re-creates indentation.
pub(crate) fn copy_node(
    doc: &mut Document,
    parent: NodeId,
    node: roxmltree::Node<'_, '_>,
) -> Result<(), DomError> {
    let id = match node.node_type() {
        roxmltree::NodeType::Element => {
            let id = doc.create_element(&qualified_element_name(node))?;
            doc.element_mut(id)?.attributes = collect_attributes(node);
            id
        }
        roxmltree::NodeType::Text => {
            let text = node.text().unwrap_or("");
            if text.trim().is_empty() {
                return Ok(());
            }
            doc.create_text(text)
        }
        roxmltree::NodeType::Comment => doc.create_comment(node.text().unwrap_or("")),
        roxmltree::NodeType::PI => match node.pi() {
            Some(pi) => doc.create_processing_instruction(pi.target, pi.value.unwrap_or("")),
            None => return Ok(()),
        },
        roxmltree::NodeType::Root => return Ok(()),
    };
    doc.append_child(parent, id)?;

    for child in node.children() {
        copy_node(doc, id, child)?;
    }
    Ok(())
}

fn qualified_element_name(node: roxmltree::Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|uri| prefix_for(node, uri)) {
        Some(prefix) => format!("{}:{}", prefix, tag.name()),
        None => tag.name().to_string(),
    }
}

fn prefix_for(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NAMESPACE {
        return Some("xml".to_string());
    }
    node.lookup_prefix(uri)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Namespace declarations made on this element, followed by its attributes.
fn collect_attributes(node: roxmltree::Node<'_, '_>) -> Vec<Attribute> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    let mut attributes: Vec<Attribute> = node
        .namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| match ns.name() {
            Some(prefix) => Attribute::new(format!("xmlns:{}", prefix), ns.uri()),
            None => Attribute::new("xmlns", ns.uri()),
        })
        .collect();

    for attr in node.attributes() {
        let name = match attr.namespace().and_then(|uri| prefix_for(node, uri)) {
            Some(prefix) => format!("{}:{}", prefix, attr.name()),
            None => attr.name().to_string(),
        };
        attributes.push(Attribute::new(name, attr.value()));
    }
    attributes
}

/// Extracts the XML declaration and DOCTYPE from the text before the document element.
fn read_prolog(head: &str) -> Prolog {
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();
    let declaration = trimmed
        .starts_with("<?xml")
        .then(|| trimmed.find("?>").map(|end| trimmed[..end + 2].to_string()))
        .flatten();
    Prolog {
        declaration,
        doctype: read_doctype(head),
    }
}

fn read_doctype(head: &str) -> Option<String> {
    let start = head.find("<!DOCTYPE")?;
    let mut depth = 0usize;
    for (offset, c) in head[start..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return Some(head[start..start + offset + 1].to_string()),
            _ => {}
        }
    }
    None
}
