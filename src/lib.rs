//! # bindery
//!
//! Converts XHTML sections and their stylesheets into a normalized,
//! style-annotated node tree, the shape an ebook reading pipeline wants:
//! flat JSON-friendly nodes with effective styles resolved per element and
//! every problem reported as data rather than by failing.
//!
//! ## Quick Start
//!
//! ```
//! use bindery::SectionProcessor;
//!
//! let resolver = |href: &str| -> Option<String> {
//!     (href == "style.css").then(|| "p { margin: 0 }".to_string())
//! };
//! let processor = SectionProcessor::new(&resolver);
//!
//! let outcome = processor.process(
//!     "ch1.xhtml",
//!     "<html><head><link rel=\"stylesheet\" href=\"style.css\"/></head>\
//!      <body><p id=\"intro\">Hello</p></body></html>",
//! );
//!
//! let nodes = outcome.value.unwrap();
//! assert!(outcome.diags.is_empty());
//! assert_eq!(nodes[0].id.as_deref(), Some("ch1.xhtml"));
//! assert_eq!(nodes[1].id.as_deref(), Some("ch1.xhtml#intro"));
//! let style = nodes[1].style.as_ref().unwrap();
//! assert_eq!(style["margin"], Some("0".to_string()));
//! ```
//!
//! ## Pipeline
//!
//! Raw section text parses into an attributed tree, the processor validates
//! the document shape and collects head-level CSS, the cascade resolves an
//! effective style per element by rule order (no specificity weighting),
//! and the lowered nodes can finally be aligned against a flat navigation
//! list to produce a table of contents. [`SectionProcessor::process_book`]
//! runs the whole pipeline over multiple sections.

pub mod book;
pub mod cascade;
pub mod combinator;
pub mod css;
pub mod diag;
pub mod error;
pub mod node;
pub mod section;
pub mod selector;
pub mod toc;
pub mod xml;

pub use book::{Book, BookSection, BookSource};
pub use cascade::{StyleMap, style_for};
pub use css::{StyleDeclaration, StyleRule, Stylesheet, parse_css, parse_inline_style};
pub use diag::{Diagnostic, Outcome, Severity};
pub use error::{Error, Result};
pub use node::BookNode;
pub use section::{SectionProcessor, TextResolver};
pub use selector::{Selector, matches, parse_selector};
pub use toc::{Toc, TocEntry, TocItem, align_toc};
pub use xml::{NodeId, XmlData, XmlTree};
