//! Whole-book assembly.
//!
//! Runs every section through the section processor, concatenates the
//! surviving node sequences in reading order, and aligns the navigation
//! list against the combined tree. A failed section contributes no nodes
//! but never aborts the rest of the book.

use serde::Serialize;

use crate::diag::Outcome;
use crate::node::BookNode;
use crate::section::SectionProcessor;
use crate::toc::{Toc, TocEntry, align_toc};

/// One content section in reading order.
#[derive(Debug, Clone)]
pub struct BookSection {
    /// Section path, used to namespace node ids and as the anchor id.
    pub path: String,
    /// Raw section markup.
    pub content: String,
}

/// Everything needed to assemble a book: title metadata, the ordered
/// sections, and the flat navigation list.
#[derive(Debug, Clone, Default)]
pub struct BookSource {
    pub title: Option<String>,
    pub sections: Vec<BookSection>,
    pub toc: Vec<TocEntry>,
}

/// The assembled book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub nodes: Vec<BookNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub toc: Toc,
}

impl SectionProcessor<'_> {
    /// Process all sections and align the navigation list.
    ///
    /// Diagnostics accumulate in section order, followed by alignment
    /// diagnostics. The outcome always carries a book.
    pub fn process_book(&self, source: &BookSource) -> Outcome<Book> {
        let mut nodes = Vec::new();
        let mut diags = Vec::new();
        for section in &source.sections {
            if let Some(section_nodes) = self.process(&section.path, &section.content).take(&mut diags)
            {
                nodes.extend(section_nodes);
            }
        }

        let toc = align_toc(&nodes, &source.toc, source.title.clone()).take(&mut diags);
        let value = toc.map(|toc| Book {
            nodes,
            title: source.title.clone(),
            toc,
        });
        Outcome::new(value, diags)
    }
}
