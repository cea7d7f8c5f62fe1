//! Document/section processing.
//!
//! A structural walker over the parsed markup tree: validates the document
//! shape, collects head-level stylesheets (linked and inline `<style>`),
//! and lowers the body subtree into semantic nodes. Every problem is
//! reported as a diagnostic; a malformed section yields no nodes but never
//! stops the caller from processing other sections.

use std::collections::BTreeMap;

use serde_json::json;

use crate::cascade::style_for;
use crate::css::{StyleRule, Stylesheet, parse_css};
use crate::diag::{Diagnostic, Outcome, Severity};
use crate::node::BookNode;
use crate::xml::{NodeId, XmlData, XmlTree};

/// Resolves linked resources (stylesheet hrefs) to their text content.
///
/// Absence is not an error by itself; the processor records a diagnostic
/// and moves on. Implemented for any `Fn(&str) -> Option<String>`.
pub trait TextResolver {
    fn resolve(&self, href: &str) -> Option<String>;
}

impl<F> TextResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, href: &str) -> Option<String> {
        self(href)
    }
}

/// Processes one document section into semantic nodes.
///
/// The href-rewrite hook is a configuration point applied to href-bearing
/// residual attributes during lowering; the default is identity.
pub struct SectionProcessor<'a> {
    resolver: &'a dyn TextResolver,
    rewrite_href: Option<Box<dyn Fn(&str) -> String + 'a>>,
}

impl<'a> SectionProcessor<'a> {
    pub fn new(resolver: &'a dyn TextResolver) -> Self {
        Self {
            resolver,
            rewrite_href: None,
        }
    }

    pub fn with_href_rewrite(mut self, rewrite: impl Fn(&str) -> String + 'a) -> Self {
        self.rewrite_href = Some(Box::new(rewrite));
        self
    }

    /// Process raw section markup. `path` namespaces node identifiers and
    /// becomes the section anchor's own identifier.
    pub fn process(&self, path: &str, content: &str) -> Outcome<Vec<BookNode>> {
        log::debug!("processing section {path}");
        match XmlTree::parse(content) {
            Ok(tree) => self.process_tree(path, &tree),
            Err(err) => {
                log::warn!("section {path} failed to parse: {err}");
                Outcome::failure(vec![
                    Diagnostic::new("unparsable document")
                        .with_severity(Severity::Error)
                        .with_context(json!({ "path": path, "error": err.to_string() })),
                ])
            }
        }
    }

    /// Process an already-parsed markup tree.
    pub fn process_tree(&self, path: &str, tree: &XmlTree) -> Outcome<Vec<BookNode>> {
        let mut diags = Vec::new();
        let value = self.process_document(path, tree, &mut diags);
        Outcome::new(value, diags)
    }

    fn process_document(
        &self,
        path: &str,
        tree: &XmlTree,
        diags: &mut Vec<Diagnostic>,
    ) -> Option<Vec<BookNode>> {
        let mut html = None;
        for &child in tree.children(tree.root()) {
            if tree.tag_name(child) == Some("html") {
                html = Some(child);
            } else if !tree.is_whitespace_text(child) {
                diags.push(
                    Diagnostic::new("unexpected root element")
                        .with_context(json!({ "xml": tree.serialize(child) })),
                );
            }
        }
        match html {
            Some(html) => self.process_html(path, tree, html, diags),
            None => {
                diags.push(
                    Diagnostic::new("no html element")
                        .with_severity(Severity::Error)
                        .with_context(json!({ "xml": tree.serialize(tree.root()) })),
                );
                None
            }
        }
    }

    fn process_html(
        &self,
        path: &str,
        tree: &XmlTree,
        html: NodeId,
        diags: &mut Vec<Diagnostic>,
    ) -> Option<Vec<BookNode>> {
        let mut head = None;
        let mut body = None;
        for &child in tree.children(html) {
            match tree.tag_name(child) {
                Some("head") => head = Some(child),
                Some("body") => body = Some(child),
                _ => {
                    if !tree.is_whitespace_text(child) {
                        diags.push(
                            Diagnostic::new("unexpected node in <html>")
                                .with_context(json!({ "xml": tree.serialize(child) })),
                        );
                    }
                }
            }
        }

        let Some(body) = body else {
            log::warn!("section {path} has no body");
            diags.push(
                Diagnostic::new("missing body node")
                    .with_severity(Severity::Error)
                    .with_context(json!({ "xml": tree.serialize(html) })),
            );
            return None;
        };

        let stylesheet = match head {
            Some(head) => self.process_head(path, tree, head, diags),
            None => Stylesheet::default(),
        };
        Some(self.process_body(path, tree, body, &stylesheet, diags))
    }

    fn process_head(
        &self,
        path: &str,
        tree: &XmlTree,
        head: NodeId,
        diags: &mut Vec<Diagnostic>,
    ) -> Stylesheet {
        let mut rules = Vec::new();
        for &child in tree.children(head) {
            match tree.tag_name(child) {
                Some("link") => rules.extend(self.process_link(tree, child, diags)),
                Some("style") => rules.extend(self.process_style_tag(path, tree, child, diags)),
                Some("title") | Some("meta") => {}
                _ => {
                    if !tree.is_whitespace_text(child) {
                        diags.push(
                            Diagnostic::new("unexpected head node")
                                .with_context(json!({ "xml": tree.serialize(child) })),
                        );
                    }
                }
            }
        }
        Stylesheet { rules }
    }

    fn process_link(
        &self,
        tree: &XmlTree,
        link: NodeId,
        diags: &mut Vec<Diagnostic>,
    ) -> Vec<StyleRule> {
        let rel = tree.attr(link, "rel").unwrap_or("");
        if !rel.eq_ignore_ascii_case("stylesheet") {
            diags.push(
                Diagnostic::new(format!("unexpected link rel: {rel}"))
                    .with_context(json!({ "xml": tree.serialize(link) })),
            );
            return Vec::new();
        }

        if let Some(kind) = tree.attr(link, "type")
            && !kind.eq_ignore_ascii_case("text/css")
        {
            // Adobe page templates show up in older epubs; known unsupported.
            if !kind.eq_ignore_ascii_case("application/vnd.adobe-page-template+xml") {
                diags.push(Diagnostic::new(format!("unexpected link type: {kind}")));
            }
            return Vec::new();
        }

        let Some(href) = tree.attr(link, "href") else {
            diags.push(
                Diagnostic::new("missing href on link")
                    .with_context(json!({ "xml": tree.serialize(link) })),
            );
            return Vec::new();
        };

        match self.resolver.resolve(href) {
            Some(content) => parse_css(&content, href)
                .take(diags)
                .map(|sheet| sheet.rules)
                .unwrap_or_default(),
            None => {
                diags.push(Diagnostic::new(format!("couldn't load css: {href}")));
                Vec::new()
            }
        }
    }

    fn process_style_tag(
        &self,
        path: &str,
        tree: &XmlTree,
        style: NodeId,
        diags: &mut Vec<Diagnostic>,
    ) -> Vec<StyleRule> {
        let type_ok = tree
            .attr(style, "type")
            .is_none_or(|t| t.eq_ignore_ascii_case("text/css"));
        let children = tree.children(style);
        let content = match children {
            [only] => tree.text(*only),
            _ => None,
        };

        match content {
            Some(text) if type_ok => parse_css(text, &format!("{path}: <style>"))
                .take(diags)
                .map(|sheet| sheet.rules)
                .unwrap_or_default(),
            _ => {
                diags.push(
                    Diagnostic::new("unsupported style tag")
                        .with_context(json!({ "xml": tree.serialize(style) })),
                );
                Vec::new()
            }
        }
    }

    fn process_body(
        &self,
        path: &str,
        tree: &XmlTree,
        body: NodeId,
        sheet: &Stylesheet,
        diags: &mut Vec<Diagnostic>,
    ) -> Vec<BookNode> {
        // The anchor guarantees a locatable section boundary even when the
        // body has no identified elements.
        let mut nodes = vec![BookNode::anchor(path)];
        for &child in tree.children(body) {
            nodes.push(self.lower_node(path, tree, child, sheet, diags));
        }
        nodes
    }

    fn lower_node(
        &self,
        path: &str,
        tree: &XmlTree,
        node: NodeId,
        sheet: &Stylesheet,
        diags: &mut Vec<Diagnostic>,
    ) -> BookNode {
        match tree.get(node).map(|n| &n.data) {
            Some(XmlData::Text(text)) => BookNode::text(text.clone()),
            Some(XmlData::Element { name, attrs }) => {
                self.lower_element(path, tree, node, name, attrs, sheet, diags)
            }
            _ => {
                diags.push(
                    Diagnostic::new("unexpected node")
                        .with_context(json!({ "xml": tree.serialize(node) })),
                );
                BookNode::default()
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_element(
        &self,
        path: &str,
        tree: &XmlTree,
        node: NodeId,
        name: &str,
        attrs: &BTreeMap<String, String>,
        sheet: &Stylesheet,
        diags: &mut Vec<Diagnostic>,
    ) -> BookNode {
        let mut result = BookNode::default();

        if let Some(id) = attrs.get("id") {
            result.id = Some(full_id(id, path));
        }

        let label = format!("{path}: <{name} style>");
        result.style = style_for(tree, node, sheet, &label, diags);

        let mut rest = BTreeMap::new();
        for (key, value) in attrs {
            if matches!(key.as_str(), "id" | "class" | "style") {
                continue;
            }
            let value = if key == "href" {
                self.fix_href(value)
            } else {
                value.clone()
            };
            rest.insert(key.clone(), value);
        }
        if !rest.is_empty() {
            result.attrs = Some(rest);
        }

        let children = tree.children(node);
        if !children.is_empty() {
            result.children = Some(
                children
                    .iter()
                    .map(|&child| self.lower_node(path, tree, child, sheet, diags))
                    .collect(),
            );
        }
        result
    }

    fn fix_href(&self, href: &str) -> String {
        match &self.rewrite_href {
            Some(rewrite) => rewrite(href),
            None => href.to_string(),
        }
    }
}

/// Section-scoped namespacing for source ids; `#` is the anchor separator,
/// matching fragment-identifier convention.
fn full_id(id: &str, path: &str) -> String {
    format!("{path}#{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_resolver(_: &str) -> Option<String> {
        None
    }

    fn process(content: &str) -> Outcome<Vec<BookNode>> {
        SectionProcessor::new(&no_resolver).process("ch1.xhtml", content)
    }

    #[test]
    fn lowers_text_and_elements() {
        let out = process(
            r#"<html><head></head><body><p id="p1" class="x" data-n="7">Hi</p></body></html>"#,
        );
        assert!(out.diags.is_empty(), "{:?}", out.diags);
        let nodes = out.value.unwrap();
        // Section anchor first, then the paragraph.
        assert_eq!(nodes[0], BookNode::anchor("ch1.xhtml"));
        let p = &nodes[1];
        assert_eq!(p.id.as_deref(), Some("ch1.xhtml#p1"));
        // class is consumed by matching, data-n survives.
        let attrs = p.attrs.as_ref().unwrap();
        assert_eq!(attrs.get("data-n").map(String::as_str), Some("7"));
        assert!(!attrs.contains_key("class"));
        assert_eq!(p.children.as_ref().unwrap()[0], BookNode::text("Hi"));
    }

    #[test]
    fn missing_body_is_terminal_with_one_diagnostic() {
        let out = process("<html><head></head></html>");
        assert!(out.value.is_none());
        assert_eq!(out.diags.len(), 1);
        assert_eq!(out.diags[0].message, "missing body node");
        assert_eq!(out.diags[0].severity, Some(Severity::Error));
    }

    #[test]
    fn missing_html_is_terminal() {
        let out = process("<root/>");
        assert!(out.value.is_none());
        let messages: Vec<_> = out.diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["unexpected root element", "no html element"]);
    }

    #[test]
    fn unparsable_markup_is_terminal() {
        let out = process("<html><body>");
        assert!(out.value.is_none());
        assert_eq!(out.diags.len(), 1);
        assert_eq!(out.diags[0].message, "unparsable document");
    }

    #[test]
    fn unexpected_html_child_is_reported_but_not_fatal() {
        let out = process("<html><nav/><body><p>x</p></body></html>");
        assert_eq!(out.diags.len(), 1);
        assert_eq!(out.diags[0].message, "unexpected node in <html>");
        assert!(out.value.is_some());
    }

    #[test]
    fn style_tag_applies_to_body() {
        let out = process(
            "<html><head><style type=\"text/css\">p { color: red }</style></head>\
             <body><p>x</p></body></html>",
        );
        assert!(out.diags.is_empty(), "{:?}", out.diags);
        let nodes = out.value.unwrap();
        let style = nodes[1].style.as_ref().unwrap();
        assert_eq!(style["color"], Some("red".to_string()));
    }

    #[test]
    fn style_tag_without_type_is_accepted() {
        let out = process(
            "<html><head><style>p { color: red }</style></head><body><p>x</p></body></html>",
        );
        assert!(out.diags.is_empty(), "{:?}", out.diags);
        assert!(out.value.unwrap()[1].style.is_some());
    }

    #[test]
    fn empty_style_tag_is_unsupported() {
        let out = process("<html><head><style/></head><body/></html>");
        assert_eq!(out.diags.len(), 1);
        assert_eq!(out.diags[0].message, "unsupported style tag");
    }

    #[test]
    fn linked_stylesheet_is_resolved_and_applied() {
        let resolver = |href: &str| {
            (href == "main.css").then(|| "p { margin: 0 }".to_string())
        };
        let out = SectionProcessor::new(&resolver).process(
            "ch1.xhtml",
            "<html><head><link rel=\"stylesheet\" type=\"text/css\" href=\"main.css\"/></head>\
             <body><p>x</p></body></html>",
        );
        assert!(out.diags.is_empty(), "{:?}", out.diags);
        let nodes = out.value.unwrap();
        assert_eq!(nodes[1].style.as_ref().unwrap()["margin"], Some("0".to_string()));
    }

    #[test]
    fn unresolved_stylesheet_link_is_diagnosed() {
        let out = process(
            "<html><head><link rel=\"stylesheet\" href=\"gone.css\"/></head>\
             <body/></html>",
        );
        assert_eq!(out.diags.len(), 1);
        assert_eq!(out.diags[0].message, "couldn't load css: gone.css");
        assert!(out.value.is_some());
    }

    #[test]
    fn link_without_href_is_diagnosed() {
        let out = process(
            "<html><head><link rel=\"stylesheet\"/></head><body/></html>",
        );
        assert_eq!(out.diags[0].message, "missing href on link");
    }

    #[test]
    fn non_stylesheet_link_rel_is_diagnosed() {
        let out = process(
            "<html><head><link rel=\"icon\" href=\"x.png\"/></head><body/></html>",
        );
        assert_eq!(out.diags[0].message, "unexpected link rel: icon");
    }

    #[test]
    fn href_rewrite_hook_applies_to_residual_attrs() {
        let resolver = no_resolver;
        let processor = SectionProcessor::new(&resolver)
            .with_href_rewrite(|href| format!("/book/{href}"));
        let out = processor.process(
            "ch1.xhtml",
            "<html><body><a href=\"ch2.xhtml#top\">next</a></body></html>",
        );
        let nodes = out.value.unwrap();
        let attrs = nodes[1].attrs.as_ref().unwrap();
        assert_eq!(
            attrs.get("href").map(String::as_str),
            Some("/book/ch2.xhtml#top")
        );
    }

    #[test]
    fn head_sheets_accumulate_in_document_order() {
        // The linked sheet comes first, so the <style> block wins the tie.
        let resolver = |_: &str| Some("p { color: red }".to_string());
        let out = SectionProcessor::new(&resolver).process(
            "ch1.xhtml",
            "<html><head>\
             <link rel=\"stylesheet\" href=\"a.css\"/>\
             <style>p { color: blue }</style>\
             </head><body><p>x</p></body></html>",
        );
        assert!(out.diags.is_empty(), "{:?}", out.diags);
        let nodes = out.value.unwrap();
        assert_eq!(
            nodes[1].style.as_ref().unwrap()["color"],
            Some("blue".to_string())
        );
    }
}
