//! JSON report generation for interview reports.
//!
//! This module provides [`JsonGenerator`] for serializing a [`Report`] to JSON.
//! Reports can be generated as compact single-line JSON or pretty-printed for
//! human readability.
//!
//! # Example
//!
//! ```rust
//! use interviewer_report::Report;
//! use interviewer_report::json::JsonGenerator;
//!
//! let report = Report::builder().session_id("3f2a").build().unwrap();
//! let generator = JsonGenerator::new(&report);
//!
//! let compact = generator.generate().unwrap();
//! let pretty = generator.generate_pretty().unwrap();
//! assert!(pretty.len() > compact.len());
//! ```

use crate::{Report, ReportError, Result};

/// JSON report generator.
///
/// Wraps a [`Report`] reference and provides methods for serializing it to JSON
/// in various formats.
pub struct JsonGenerator<'a> {
    report: &'a Report,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a new JSON generator for the given report.
    #[must_use]
    pub const fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Generates compact JSON output (single line, no extra whitespace).
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.report).map_err(ReportError::from)
    }

    /// Generates pretty-printed JSON output with indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.report).map_err(ReportError::from)
    }
}
