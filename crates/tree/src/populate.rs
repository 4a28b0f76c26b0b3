//! Reconstructing a tree from learned schema knowledge.

use crate::error::TreeError;
use crate::node::TreeConfig;
use crate::tree::DocumentTree;
use xprofile_dom::Document;
use xprofile_traits::SchemaProvider;
use xprofile_types::NodeId;

impl DocumentTree {
    /// Builds a skeleton document from what `schema` knows.
    ///
    /// With no `start`, every known root is expanded as a top-level element.
    /// A `start` naming a root expands that root; any other known element is
    /// expanded on its own under the first root that knows it.
    ///
    /// Elements get every known attribute with an empty value. An element is
    /// not expanded again below itself, so recursive schemas terminate.
    pub fn from_schema(
        schema: &dyn SchemaProvider,
        start: Option<&str>,
        config: TreeConfig,
    ) -> Result<Self, TreeError> {
        let roots = schema.roots()?;
        let starts: Vec<(String, String)> = match start {
            None => roots.iter().map(|r| (r.clone(), r.clone())).collect(),
            Some(name) if roots.iter().any(|r| r == name) => {
                vec![(name.to_string(), name.to_string())]
            }
            Some(name) => vec![(name.to_string(), root_knowing(schema, &roots, name)?)],
        };

        let mut doc = Document::new();
        for (element, root) in &starts {
            let id = build_element(&mut doc, schema, element, "", root)?;
            let top = doc.document_node();
            doc.append_child(top, id)?;
            let mut path = vec![element.clone()];
            expand(&mut doc, schema, id, root, &mut path)?;
        }
        log::info!(
            "Populated {} top-level elements ({} nodes) from {}",
            starts.len(),
            doc.len(),
            schema.name()
        );
        Ok(Self::new(doc, config))
    }
}

fn root_knowing(schema: &dyn SchemaProvider, roots: &[String], name: &str) -> Result<String, TreeError> {
    for root in roots {
        if schema.known_elements(root)?.iter().any(|e| e == name) {
            return Ok(root.clone());
        }
    }
    Err(TreeError::UnknownElement(name.to_string()))
}

fn build_element(
    doc: &mut Document,
    schema: &dyn SchemaProvider,
    name: &str,
    parent: &str,
    root: &str,
) -> Result<NodeId, TreeError> {
    let id = doc.create_element(name)?;
    for attribute in schema.attributes(name, parent, root)? {
        doc.set_attribute(id, &attribute, "")?;
    }
    Ok(id)
}

// `path` holds the element names from the start element down to `id`.
fn expand(
    doc: &mut Document,
    schema: &dyn SchemaProvider,
    id: NodeId,
    root: &str,
    path: &mut Vec<String>,
) -> Result<(), TreeError> {
    let name = path.last().cloned().unwrap_or_default();
    let parent = match path.len() {
        0 | 1 => String::new(),
        n => path[n - 2].clone(),
    };

    for child in schema.children(&name, &parent, root)? {
        if path.contains(&child) {
            log::debug!("Not expanding <{}> again below {}", child, path.join("/"));
            continue;
        }
        let child_id = build_element(doc, schema, &child, &name, root)?;
        doc.append_child(id, child_id)?;
        path.push(child);
        expand(doc, schema, child_id, root, path)?;
        path.pop();
    }
    Ok(())
}
