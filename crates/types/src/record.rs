use serde::{Deserialize, Serialize};

/// One normalized observation of an element inside a document type.
///
/// A record with an empty `attribute` and `value` describes a bare
/// parent/child edge. The five fields together are unique within a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementRecord {
    pub root: String,
    pub parent: String,
    pub element: String,
    pub attribute: String,
    pub value: String,
}

impl ElementRecord {
    /// A parent/child edge without attribute data.
    pub fn edge(
        element: impl Into<String>,
        parent: impl Into<String>,
        root: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            parent: parent.into(),
            element: element.into(),
            attribute: String::new(),
            value: String::new(),
        }
    }

    /// An attribute occurrence on `element` under `parent`.
    pub fn attribute(
        element: impl Into<String>,
        parent: impl Into<String>,
        root: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            parent: parent.into(),
            element: element.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn is_edge(&self) -> bool {
        self.attribute.is_empty()
    }
}
