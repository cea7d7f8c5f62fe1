//! Diagnostics as data.
//!
//! Every stage of the pipeline reports problems by appending [`Diagnostic`]
//! records to an [`Outcome`] instead of returning errors. A diagnostic never
//! carries control-flow meaning: a stage that cannot produce a value returns
//! an `Outcome` with no value and the diagnostics explaining why, and the
//! caller decides what to do with the rest of the input.

use serde::Serialize;

/// How bad a diagnostic is.
///
/// Local, recoverable problems carry no severity at all; `Error` marks
/// section-terminal conditions (no html element, missing body, unparsable
/// markup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A structured, non-fatal problem report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Opaque context payload, e.g. a serialization of the offending subtree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: None,
            context: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// The result of a pipeline stage: an optional value plus the diagnostics
/// collected while producing it.
///
/// An absent value means the stage could not produce output (section-terminal
/// failure); diagnostics are present either way, in traversal order.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub diags: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    /// A successful outcome with no diagnostics.
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            diags: Vec::new(),
        }
    }

    pub fn new(value: Option<T>, diags: Vec<Diagnostic>) -> Self {
        Self { value, diags }
    }

    /// A failed outcome carrying only diagnostics.
    pub fn failure(diags: Vec<Diagnostic>) -> Self {
        Self { value: None, diags }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: self.value.map(f),
            diags: self.diags,
        }
    }

    /// Drain the diagnostics into `sink` and return the value.
    ///
    /// This is the standard way a caller folds a nested stage's diagnostics
    /// into its own, preserving traversal order.
    pub fn take(self, sink: &mut Vec<Diagnostic>) -> Option<T> {
        sink.extend(self.diags);
        self.value
    }
}
