//! Style cascade.
//!
//! Resolves the effective declaration set for an element: every matching
//! rule contributes its declarations in stylesheet order, inline `style`
//! declarations are appended last, and the whole sequence folds left to
//! right with last-writer-wins. Rule order is the only precedence — this
//! engine deliberately models no CSS specificity weighting.

use std::collections::BTreeMap;

use crate::css::{Stylesheet, parse_inline_style};
use crate::diag::Diagnostic;
use crate::selector::matches;
use crate::xml::{NodeId, XmlTree};

/// Flat effective style for one element. Absent values come from
/// declarations whose value text was malformed.
pub type StyleMap = BTreeMap<String, Option<String>>;

/// Compute the effective style for an element, or None when nothing
/// applies. `label` attributes inline-style diagnostics to their source.
pub fn style_for(
    tree: &XmlTree,
    node: NodeId,
    sheet: &Stylesheet,
    label: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<StyleMap> {
    let inline_rules = match tree.attr(node, "style") {
        Some(style) => parse_inline_style(style, label)
            .take(diags)
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let mut declarations = Vec::new();
    for rule in &sheet.rules {
        if matches(tree, node, &rule.selector) {
            declarations.extend(rule.declarations.iter());
        }
    }
    // Inline style always wins: its declarations are appended after every
    // stylesheet rule.
    for rule in &inline_rules {
        declarations.extend(rule.declarations.iter());
    }

    if declarations.is_empty() {
        return None;
    }
    let mut style = StyleMap::new();
    for decl in declarations {
        style.insert(decl.property.clone(), decl.value.clone());
    }
    Some(style)
}
