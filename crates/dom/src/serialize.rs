//! Line-oriented XML rendering.
//!
//! The layout is fixed so that the text view and the tree can be matched line
//! by line:
//! - every element start tag begins its own line
//! - an element whose children are all text stays on one line
//! - a closing tag sits alone on its line
//! - comments keep their own lines, including any line breaks inside them

use crate::document::{Document, NodeKind};
use quick_xml::escape::{escape, partial_escape};
use xprofile_types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

/// Renders the whole document, prolog included.
pub fn to_string(doc: &Document, options: SerializeOptions) -> String {
    let mut out = String::new();
    if let Some(declaration) = &doc.prolog.declaration {
        out.push_str(declaration);
        out.push('\n');
    }
    if let Some(doctype) = &doc.prolog.doctype {
        out.push_str(doctype);
        out.push('\n');
    }
    for child in doc.children(doc.document_node()) {
        write_node(doc, *child, 0, options, &mut out);
    }
    out
}

/// Renders one node and its subtree as if it were at the top level.
pub fn node_to_string(doc: &Document, id: NodeId, options: SerializeOptions) -> String {
    let mut out = String::new();
    write_node(doc, id, 0, options, &mut out);
    out
}

/// The opening tag of an element, e.g. `<server host="a">`.
pub fn start_tag(doc: &Document, id: NodeId) -> Option<String> {
    let name = doc.name(id)?;
    let mut tag = format!("<{}", name);
    push_attributes(doc, id, &mut tag);
    tag.push('>');
    Some(tag)
}

fn push_attributes(doc: &Document, id: NodeId, out: &mut String) {
    for attr in doc.attributes(id) {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }
}

fn push_indent(depth: usize, options: SerializeOptions, out: &mut String) {
    out.extend(std::iter::repeat_n(' ', depth * options.indent));
}

fn write_node(doc: &Document, id: NodeId, depth: usize, options: SerializeOptions, out: &mut String) {
    let Ok(kind) = doc.kind(id) else {
        return;
    };
    match kind {
        NodeKind::Document => {
            for child in doc.children(id) {
                write_node(doc, *child, depth, options, out);
            }
        }
        NodeKind::Element(data) => {
            let children = doc.children(id);
            push_indent(depth, options, out);
            out.push('<');
            out.push_str(&data.name);
            push_attributes(doc, id, out);

            if children.is_empty() {
                out.push_str("/>\n");
                return;
            }

            let text_only = children
                .iter()
                .all(|c| matches!(doc.kind(*c), Ok(NodeKind::Text(_))));
            if text_only {
                out.push('>');
                out.push_str(&partial_escape(doc.text(id).as_str()));
                out.push_str("</");
                out.push_str(&data.name);
                out.push_str(">\n");
                return;
            }

            out.push_str(">\n");
            for child in children {
                write_node(doc, *child, depth + 1, options, out);
            }
            push_indent(depth, options, out);
            out.push_str("</");
            out.push_str(&data.name);
            out.push_str(">\n");
        }
        NodeKind::Text(text) => {
            push_indent(depth, options, out);
            out.push_str(&partial_escape(text.trim()));
            out.push('\n');
        }
        NodeKind::Comment(text) => {
            push_indent(depth, options, out);
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->\n");
        }
        NodeKind::ProcessingInstruction { target, value } => {
            push_indent(depth, options, out);
            out.push_str("<?");
            out.push_str(target);
            if !value.is_empty() {
                out.push(' ');
                out.push_str(value);
            }
            out.push_str("?>\n");
        }
    }
}
