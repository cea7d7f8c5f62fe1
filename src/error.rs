//! Error types for bindery operations.

use thiserror::Error;

/// Errors that can occur while building the markup tree.
///
/// These only surface at the markup-adapter boundary; every failure inside
/// the processing stages is reported as a [`Diagnostic`](crate::Diagnostic)
/// instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
