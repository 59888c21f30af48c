//! JSON report generation.
//!
//! [`JsonGenerator`] serializes any report type, compact for piping into other
//! tools or pretty-printed for reading.
//!
//! # Example
//!
//! ```rust
//! use smartgoal_report::json::JsonGenerator;
//! use smartgoal_report::RosterReport;
//! use smartgoal_core::GroupFilter;
//!
//! let report = RosterReport {
//!     course_name: "Goals 101".to_string(),
//!     assignment_name: "Week 1".to_string(),
//!     group_filter: GroupFilter::All,
//!     needs_review: false,
//!     page: 0,
//!     page_count: 1,
//!     total_matching: 0,
//!     total_rows: 0,
//!     rows: vec![],
//! };
//!
//! let compact = JsonGenerator::new(&report).generate().unwrap();
//! assert!(compact.contains(r#""group_filter":"all""#));
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::{ReportError, Result};

/// JSON report generator.
pub struct JsonGenerator<'a, T: Serialize> {
    report: &'a T,
}

impl<'a, T: Serialize> JsonGenerator<'a, T> {
    /// Creates a new JSON generator for the given report.
    #[must_use]
    pub const fn new(report: &'a T) -> Self {
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

    /// Writes the JSON report to a file, creating or overwriting it.
    ///
    /// Parent directories must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    /// Returns [`ReportError::Io`] if file creation or writing fails.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
