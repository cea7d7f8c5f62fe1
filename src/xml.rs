//! Arena-based markup tree.
//!
//! The processing stages consume a pre-parsed attributed tree: document,
//! element, and text nodes stored in a contiguous arena addressed by index.
//! Ownership is unidirectional (the arena owns every node); the parent link
//! is a lookup-only edge, which is what makes upward selector matching
//! possible without reference-counted cycles.
//!
//! [`XmlTree::parse`] is a convenience adapter that builds the arena from
//! raw XHTML text with quick-xml. The walkers depend only on the arena
//! shape, never on the adapter.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Node variant in the markup tree.
#[derive(Debug, Clone)]
pub enum XmlData {
    /// Document root.
    Document,
    /// Element with tag name and attributes. Attribute order is not
    /// semantically relevant, so a sorted map keeps output deterministic.
    Element {
        name: String,
        attrs: BTreeMap<String, String>,
    },
    /// Text content.
    Text(String),
}

/// A node in the markup tree.
#[derive(Debug)]
pub struct XmlNode {
    pub data: XmlData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-allocated markup tree with a document root.
#[derive(Debug)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
}

impl XmlTree {
    /// Create an empty tree holding only the document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![XmlNode {
                data: XmlData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn alloc(&mut self, parent: NodeId, data: XmlData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(XmlNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    /// Append an element child, returning its id.
    pub fn add_element(&mut self, parent: NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.add_element_with(parent, name.to_string(), attrs)
    }

    /// Append an element child with an owned attribute map.
    pub fn add_element_with(
        &mut self,
        parent: NodeId,
        name: String,
        attrs: BTreeMap<String, String>,
    ) -> NodeId {
        self.alloc(parent, XmlData::Element { name, attrs })
    }

    /// Append a text child. Adjacent text nodes are merged, so entity
    /// references resolved by the adapter do not split their surrounding
    /// text.
    pub fn add_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let last = self.nodes[parent.0 as usize].children.last().copied();
        if let Some(last) = last
            && let XmlData::Text(existing) = &mut self.nodes[last.0 as usize].data
        {
            existing.push_str(text);
            return last;
        }
        self.alloc(parent, XmlData::Text(text.to_string()))
    }

    pub fn get(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element tag name, or None for non-element nodes.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            XmlData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// An attribute value on an element node.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id).and_then(|a| a.get(name).map(String::as_str))
    }

    /// The full attribute map of an element node.
    pub fn attrs(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        self.get(id).and_then(|n| match &n.data {
            XmlData::Element { attrs, .. } => Some(attrs),
            _ => None,
        })
    }

    /// Text content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            XmlData::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// True for text nodes containing only whitespace.
    pub fn is_whitespace_text(&self, id: NodeId) -> bool {
        self.text(id)
            .is_some_and(|t| t.chars().all(char::is_whitespace))
    }

    /// Walk the parent chain upward, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
    }

    /// Serialize a subtree back to markup text, for diagnostic payloads.
    pub fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.data {
            XmlData::Document => {
                for &child in &node.children {
                    self.write_node(child, out);
                }
            }
            XmlData::Text(text) => out.push_str(text),
            XmlData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                if node.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }

    /// Build a tree from raw XHTML text.
    ///
    /// Comments, processing instructions, doctype and XML declarations are
    /// dropped. Entity references are resolved where known; unresolvable
    /// ones are dropped from the text.
    pub fn parse(input: &str) -> Result<XmlTree> {
        let mut reader = Reader::from_str(input);
        let mut tree = XmlTree::new();
        let root = tree.root();
        let mut stack = vec![root];

        loop {
            // The stack always holds at least the document root; End pops
            // only when a matching Start was pushed.
            let parent = stack.last().copied().unwrap_or(root);
            match reader.read_event()? {
                Event::Start(e) => {
                    let id =
                        tree.add_element_with(parent, decode(e.name().as_ref()), read_attrs(&e)?);
                    stack.push(id);
                }
                Event::Empty(e) => {
                    tree.add_element_with(parent, decode(e.name().as_ref()), read_attrs(&e)?);
                }
                Event::End(e) => {
                    if stack.len() <= 1 {
                        return Err(Error::InvalidDocument(format!(
                            "unexpected end tag: {}",
                            decode(e.name().as_ref())
                        )));
                    }
                    stack.pop();
                }
                Event::Text(e) => {
                    tree.add_text(parent, &decode(e.as_ref()));
                }
                Event::CData(e) => {
                    tree.add_text(parent, &decode(e.as_ref()));
                }
                Event::GeneralRef(e) => {
                    if let Some(resolved) = resolve_entity(&decode(e.as_ref())) {
                        tree.add_text(parent, &resolved);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(Error::InvalidDocument("unclosed element".to_string()));
        }
        Ok(tree)
    }
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn read_attrs(e: &quick_xml::events::BytesStart) -> Result<BTreeMap<String, String>> {
    let mut attrs = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        attrs.insert(decode(attr.key.as_ref()), decode(&attr.value));
    }
    Ok(attrs)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_with_parent_links() {
        let mut tree = XmlTree::new();
        let div = tree.add_element(tree.root(), "div", &[("id", "main")]);
        let p = tree.add_element(div, "p", &[]);
        let text = tree.add_text(p, "hello");

        assert_eq!(tree.tag_name(div), Some("div"));
        assert_eq!(tree.attr(div, "id"), Some("main"));
        assert_eq!(tree.parent(p), Some(div));
        assert_eq!(tree.text(text), Some("hello"));

        let ancestors: Vec<_> = tree.ancestors(text).collect();
        assert_eq!(ancestors, vec![p, div, tree.root()]);
    }

    #[test]
    fn parses_nested_markup() {
        let tree = XmlTree::parse(r#"<html><body><p class="a">Hi<br/> there</p></body></html>"#)
            .unwrap();
        let html = tree.children(tree.root())[0];
        assert_eq!(tree.tag_name(html), Some("html"));
        let body = tree.children(html)[0];
        let p = tree.children(body)[0];
        assert_eq!(tree.attr(p, "class"), Some("a"));
        assert_eq!(tree.children(p).len(), 3);
        assert_eq!(tree.text(tree.children(p)[0]), Some("Hi"));
        assert_eq!(tree.tag_name(tree.children(p)[1]), Some("br"));
    }

    #[test]
    fn resolves_entities_into_adjacent_text() {
        let tree = XmlTree::parse("<p>a &amp; b &#169;</p>").unwrap();
        let p = tree.children(tree.root())[0];
        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(tree.text(tree.children(p)[0]), Some("a & b \u{a9}"));
    }

    #[test]
    fn rejects_mismatched_structure() {
        assert!(XmlTree::parse("<p>text").is_err());
    }

    #[test]
    fn serializes_subtree() {
        let mut tree = XmlTree::new();
        let div = tree.add_element(tree.root(), "div", &[("id", "x")]);
        tree.add_text(div, "hi");
        assert_eq!(tree.serialize(div), r#"<div id="x">hi</div>"#);
    }

    #[test]
    fn whitespace_text_detection() {
        let mut tree = XmlTree::new();
        let ws = tree.add_text(tree.root(), "  \n\t");
        let solid = tree.add_element(tree.root(), "p", &[]);
        let word = tree.add_text(solid, "x");
        assert!(tree.is_whitespace_text(ws));
        assert!(!tree.is_whitespace_text(word));
        assert!(!tree.is_whitespace_text(solid));
    }
}
