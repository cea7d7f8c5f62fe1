//! Table-of-contents alignment.
//!
//! Matches a flat navigation list against the finished semantic tree: a
//! pre-order walk assigns every node a structural path and a linear
//! position, and each navigation entry binds to the first visited node
//! whose identifier equals its href.

use serde::Serialize;
use serde_json::json;

use crate::diag::{Diagnostic, Outcome};
use crate::node::BookNode;

/// One entry of the navigation list supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    pub href: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

/// A navigation entry resolved to a location in the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocItem {
    pub title: String,
    pub level: u8,
    /// Child-index path from the root to the node.
    pub path: Vec<usize>,
    /// Pre-order index of the node, counted from 0.
    pub position: usize,
}

/// The aligned table of contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<TocItem>,
    /// Total node count of the walked tree.
    pub length: usize,
}

/// Align navigation entries against the node tree.
///
/// Each entry binds at most once, to the first node in document order whose
/// id equals its href. Entries left over after the walk are reported in a
/// single `unresolved toc items` diagnostic; alignment itself never fails.
pub fn align_toc(nodes: &[BookNode], entries: &[TocEntry], title: Option<String>) -> Outcome<Toc> {
    let mut walker = Walker {
        unconsumed: entries.iter().collect(),
        items: Vec::new(),
        position: 0,
    };
    let mut path = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        path.push(index);
        walker.visit(node, &mut path);
        path.pop();
    }

    let mut diags = Vec::new();
    if !walker.unconsumed.is_empty() {
        log::warn!("{} toc entries did not align", walker.unconsumed.len());
        diags.push(
            Diagnostic::new("unresolved toc items")
                .with_context(json!({ "items": walker.unconsumed })),
        );
    }

    Outcome::new(
        Some(Toc {
            title,
            items: walker.items,
            length: walker.position,
        }),
        diags,
    )
}

struct Walker<'a> {
    unconsumed: Vec<&'a TocEntry>,
    items: Vec<TocItem>,
    position: usize,
}

impl Walker<'_> {
    fn visit(&mut self, node: &BookNode, path: &mut Vec<usize>) {
        if let Some(id) = &node.id
            && let Some(found) = self.unconsumed.iter().position(|e| &e.href == id)
        {
            let entry = self.unconsumed.remove(found);
            self.items.push(TocItem {
                title: entry.title.clone(),
                level: entry.level.unwrap_or(0),
                path: path.clone(),
                position: self.position,
            });
        }
        self.position += 1;

        for (index, child) in node.children.iter().flatten().enumerate() {
            path.push(index);
            self.visit(child, path);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(href: &str, title: &str, level: Option<u8>) -> TocEntry {
        TocEntry {
            href: href.to_string(),
            title: title.to_string(),
            level,
        }
    }

    #[test]
    fn aligns_entry_to_linear_position() {
        let nodes = vec![
            BookNode::anchor("a"),
            BookNode::anchor("b"),
            BookNode::anchor("c"),
        ];
        let out = align_toc(&nodes, &[entry("b", "T", Some(1))], None);
        assert!(out.diags.is_empty());
        let toc = out.value.unwrap();
        assert_eq!(toc.length, 3);
        assert_eq!(
            toc.items,
            vec![TocItem {
                title: "T".to_string(),
                level: 1,
                path: vec![1],
                position: 1,
            }]
        );
    }

    #[test]
    fn unresolved_entries_yield_one_diagnostic() {
        let nodes = vec![BookNode::anchor("a")];
        let out = align_toc(&nodes, &[entry("z", "Gone", None)], None);
        let toc = out.value.unwrap();
        assert!(toc.items.is_empty());
        assert_eq!(out.diags.len(), 1);
        assert_eq!(out.diags[0].message, "unresolved toc items");
        let context = out.diags[0].context.as_ref().unwrap();
        assert_eq!(context["items"][0]["href"], "z");
    }

    #[test]
    fn entries_consume_first_match_only() {
        let nodes = vec![BookNode::anchor("a"), BookNode::anchor("a")];
        let out = align_toc(
            &nodes,
            &[entry("a", "First", None), entry("a", "Second", None)],
            None,
        );
        assert!(out.diags.is_empty());
        let toc = out.value.unwrap();
        assert_eq!(toc.items.len(), 2);
        assert_eq!(toc.items[0].title, "First");
        assert_eq!(toc.items[0].position, 0);
        assert_eq!(toc.items[1].title, "Second");
        assert_eq!(toc.items[1].position, 1);
    }

    #[test]
    fn walk_covers_nested_children_in_preorder() {
        let inner = BookNode {
            id: Some("deep".to_string()),
            ..BookNode::default()
        };
        let parent = BookNode {
            children: Some(vec![BookNode::text("x"), inner]),
            ..BookNode::default()
        };
        let nodes = vec![BookNode::anchor("top"), parent];
        let out = align_toc(&nodes, &[entry("deep", "Deep", Some(2))], None);
        let toc = out.value.unwrap();
        // top(0), parent(1), text(2), deep(3)
        assert_eq!(toc.length, 4);
        assert_eq!(toc.items[0].position, 3);
        assert_eq!(toc.items[0].path, vec![1, 1]);
    }

    #[test]
    fn missing_level_defaults_to_zero() {
        let nodes = vec![BookNode::anchor("a")];
        let out = align_toc(&nodes, &[entry("a", "T", None)], Some("Book".to_string()));
        let toc = out.value.unwrap();
        assert_eq!(toc.items[0].level, 0);
        assert_eq!(toc.title.as_deref(), Some("Book"));
    }
}
