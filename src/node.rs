//! Semantic node tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cascade::StyleMap;

/// One node of the lowered semantic tree.
///
/// Every field is optional; a section anchor carries only an id, a text
/// leaf only content. Nodes are built bottom-up during the document walk
/// and never mutated after being returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookNode {
    /// Stable identifier, namespaced by the originating section path
    /// (`"<path>#<source-id>"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Effective style, property to value, last-writer-wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleMap>,
    /// Source attributes minus `id`, `class` and `style`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attrs: Option<BTreeMap<String, String>>,
    /// Child nodes in source order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookNode>>,
    /// Literal text, for text leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl BookNode {
    /// A text leaf.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A node carrying only an identifier, used as a section anchor.
    pub fn anchor(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}
