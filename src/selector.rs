//! CSS selector grammar and matcher.
//!
//! Supports the subset the stylesheet parser needs: universal, element,
//! class, and id atoms, conjunctions written by juxtaposition (`p.note`),
//! disjunctions produced by comma-separated rule selectors, and a single
//! descendant combinator (`div span`). Anything else fails to parse and the
//! caller drops the rule with a diagnostic.

use crate::combinator::{Parser, choice, many1, map, pair, pattern};
use crate::xml::{NodeId, XmlTree};

/// A parsed selector expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Universal,
    Element(String),
    Class(String),
    Id(String),
    /// Conjunction of simple selectors; all members must match.
    And(Vec<Selector>),
    /// Disjunction; any member may match.
    Or(Vec<Selector>),
    /// Descendant combinator. The second operand is checked at the node
    /// itself, the first against its strict ancestors.
    Descendant(Box<Selector>, Box<Selector>),
}

impl Selector {
    /// Canonical textual form, reparseable by [`parse_selector`] except for
    /// `Or`, which only arises from comma-separated rule selectors.
    pub fn to_css(&self) -> String {
        match self {
            Selector::Universal => "*".to_string(),
            Selector::Element(name) => name.clone(),
            Selector::Class(name) => format!(".{name}"),
            Selector::Id(name) => format!("#{name}"),
            Selector::And(members) => members.iter().map(Selector::to_css).collect(),
            Selector::Or(members) => members
                .iter()
                .map(Selector::to_css)
                .collect::<Vec<_>>()
                .join(", "),
            Selector::Descendant(ancestor, descendant) => {
                format!("{} {}", ancestor.to_css(), descendant.to_css())
            }
        }
    }
}

/// Collapse a singleton conjunction to the atom itself.
fn conjunction(atoms: Vec<Selector>) -> Selector {
    let mut atoms = atoms;
    if atoms.len() == 1 {
        atoms.remove(0)
    } else {
        Selector::And(atoms)
    }
}

fn atom() -> impl Parser<Selector> {
    choice(vec![
        Box::new(map(pattern(r"\*"), |_| Selector::Universal)) as Box<dyn Parser<Selector>>,
        Box::new(map(pattern("[a-z]+"), Selector::Element)),
        Box::new(map(pattern(r"\.[a-z]+"), |s: String| {
            Selector::Class(s[1..].to_string())
        })),
        Box::new(map(pattern("#[a-z]+"), |s: String| {
            Selector::Id(s[1..].to_string())
        })),
    ])
}

/// Parse a single selector string. Returns None when the string does not
/// fit the supported grammar or has trailing input.
pub fn parse_selector(input: &str) -> Option<Selector> {
    let conj = || map(many1(atom()), conjunction);
    // A descendant pair is tried first; ordered choice falls back to the
    // bare conjunction when no space part follows.
    let selector = choice(vec![
        Box::new(map(
            pair(conj(), pair(pattern(" "), conj())),
            |(ancestor, (_, descendant))| {
                Selector::Descendant(Box::new(ancestor), Box::new(descendant))
            },
        )) as Box<dyn Parser<Selector>>,
        Box::new(conj()),
    ]);

    match selector.parse(input.trim()) {
        Some((value, rest)) if rest.is_empty() => Some(value),
        _ => None,
    }
}

/// Evaluate a selector against a tree node.
///
/// Only element nodes participate; text and document nodes never match.
pub fn matches(tree: &XmlTree, node: NodeId, selector: &Selector) -> bool {
    let Some(tag) = tree.tag_name(node) else {
        return false;
    };
    match selector {
        Selector::Universal => true,
        // Case-sensitive against the source markup casing.
        Selector::Element(name) => tag == name,
        Selector::Class(name) => tree.attr(node, "class").is_some_and(|classes| {
            classes
                .split_whitespace()
                .any(|c| c.eq_ignore_ascii_case(name))
        }),
        Selector::Id(name) => tree.attr(node, "id") == Some(name.as_str()),
        Selector::And(members) => members.iter().all(|s| matches(tree, node, s)),
        Selector::Or(members) => members.iter().any(|s| matches(tree, node, s)),
        Selector::Descendant(ancestor, descendant) => {
            matches(tree, node, descendant)
                && tree.ancestors(node).any(|a| matches(tree, a, ancestor))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_atoms() {
        assert_eq!(parse_selector("*"), Some(Selector::Universal));
        assert_eq!(parse_selector("div"), Some(Selector::Element("div".into())));
        assert_eq!(parse_selector(".note"), Some(Selector::Class("note".into())));
        assert_eq!(parse_selector("#top"), Some(Selector::Id("top".into())));
    }

    #[test]
    fn parses_conjunction_and_collapses_singleton() {
        assert_eq!(
            parse_selector("p.note"),
            Some(Selector::And(vec![
                Selector::Element("p".into()),
                Selector::Class("note".into()),
            ]))
        );
        // A single atom is the atom itself, not And([atom]).
        assert_eq!(parse_selector("p"), Some(Selector::Element("p".into())));
    }

    #[test]
    fn parses_descendant() {
        assert_eq!(
            parse_selector("div span"),
            Some(Selector::Descendant(
                Box::new(Selector::Element("div".into())),
                Box::new(Selector::Element("span".into())),
            ))
        );
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert_eq!(parse_selector("p > span"), None);
        assert_eq!(parse_selector("p:hover"), None);
        assert_eq!(parse_selector("div p span"), None);
        assert_eq!(parse_selector(""), None);
    }

    #[test]
    fn element_match_is_case_sensitive() {
        let mut tree = XmlTree::new();
        let div = tree.add_element(tree.root(), "DIV", &[]);
        assert!(!matches(&tree, div, &Selector::Element("div".into())));
        assert!(matches(&tree, div, &Selector::Element("DIV".into())));
    }

    #[test]
    fn class_match_splits_and_ignores_case() {
        let mut tree = XmlTree::new();
        let p = tree.add_element(tree.root(), "p", &[("class", "Big note")]);
        assert!(matches(&tree, p, &Selector::Class("big".into())));
        assert!(matches(&tree, p, &Selector::Class("note".into())));
        assert!(!matches(&tree, p, &Selector::Class("missing".into())));
    }

    #[test]
    fn singleton_and_is_equivalent_to_member() {
        let mut tree = XmlTree::new();
        let p = tree.add_element(tree.root(), "p", &[("id", "x")]);
        for selector in [
            Selector::Element("p".into()),
            Selector::Id("x".into()),
            Selector::Class("nope".into()),
        ] {
            assert_eq!(
                matches(&tree, p, &Selector::And(vec![selector.clone()])),
                matches(&tree, p, &selector),
            );
        }
    }

    #[test]
    fn descendant_is_not_commutative() {
        // <div><p><span/></p></div>
        let mut tree = XmlTree::new();
        let div = tree.add_element(tree.root(), "div", &[]);
        let p = tree.add_element(div, "p", &[]);
        let span = tree.add_element(p, "span", &[]);

        let div_span = parse_selector("div span").unwrap();
        let span_div = parse_selector("span div").unwrap();

        assert!(matches(&tree, span, &div_span));
        for node in [div, p, span] {
            assert!(!matches(&tree, node, &span_div));
        }
    }

    #[test]
    fn descendant_ancestor_never_matches_node_itself() {
        let mut tree = XmlTree::new();
        let outer = tree.add_element(tree.root(), "div", &[]);
        let inner = tree.add_element(outer, "div", &[]);
        let selector = parse_selector("div div").unwrap();
        assert!(matches(&tree, inner, &selector));
        assert!(!matches(&tree, outer, &selector));
    }

    #[test]
    fn text_nodes_never_match() {
        let mut tree = XmlTree::new();
        let text = tree.add_text(tree.root(), "hello");
        assert!(!matches(&tree, text, &Selector::Universal));
    }

    #[test]
    fn to_css_round_trips() {
        for input in ["*", "div", ".note", "#top", "p.note", "div span", "*#a.b"] {
            let parsed = parse_selector(input).unwrap();
            assert_eq!(parse_selector(&parsed.to_css()), Some(parsed));
        }
    }

    fn name() -> impl Strategy<Value = String> {
        "[a-z]{1,6}"
    }

    // Element atoms only lead a conjunction; `ab` written as two adjacent
    // element atoms is indistinguishable from one element named `ab`.
    fn conjunction_str() -> impl Strategy<Value = String> {
        let head = prop_oneof![Just("*".to_string()), name()];
        let tail = prop::collection::vec(
            prop_oneof![
                name().prop_map(|n| format!(".{n}")),
                name().prop_map(|n| format!("#{n}")),
            ],
            0..3,
        );
        (head, tail).prop_map(|(head, tail)| {
            let mut s = head;
            for atom in tail {
                s.push_str(&atom);
            }
            s
        })
    }

    proptest! {
        #[test]
        fn prop_canonical_form_round_trips(
            ancestor in conjunction_str(),
            descendant in proptest::option::of(conjunction_str()),
        ) {
            let input = match &descendant {
                Some(d) => format!("{ancestor} {d}"),
                None => ancestor.clone(),
            };
            let parsed = parse_selector(&input).unwrap();
            prop_assert_eq!(parsed.to_css(), input.clone());
            prop_assert_eq!(parse_selector(&parsed.to_css()), Some(parsed));
        }
    }
}
