//! Batch report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Outcome of one input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Extracted,
    Failed,
}

/// Per-file entry of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// File display name
    pub name: String,

    /// SHA-256 of the input bytes, hex encoded
    pub sha256: String,

    pub status: SourceStatus,

    /// Records contributed (0 when failed)
    pub records: usize,
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of diagnostics
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of info messages
    pub info: usize,

    /// Files that produced records
    pub files_extracted: usize,

    /// Files that failed extraction
    pub files_failed: usize,

    /// Records in the combined table
    pub records: usize,

    /// Nodes in the dependency graph
    pub nodes: usize,

    /// Edges in the dependency graph
    pub edges: usize,
}

/// Batch report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (RFC 3339)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// One entry per input file, in input order
    pub sources: Vec<SourceSummary>,

    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            sources: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => self.summary.info += 1,
        }

        self.summary.total += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Record the outcome of one input file
    pub fn add_source(&mut self, source: SourceSummary) {
        match source.status {
            SourceStatus::Extracted => self.summary.files_extracted += 1,
            SourceStatus::Failed => self.summary.files_failed += 1,
        }
        self.sources.push(source);
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};

    #[test]
    fn empty_report() {
        let report = Report::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.total, 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn diagnostics_are_counted() {
        let mut report = Report::new();
        report.add_diagnostic(Diagnostic::new(DiagnosticCode::ExtractionFailure, Severity::Error, "bad zip"));
        report.add_diagnostic(Diagnostic::new(DiagnosticCode::UnbalancedBrackets, Severity::Info, "[A"));

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.info, 1);
        assert!(report.has_errors());
    }

    #[test]
    fn sources_are_counted() {
        let mut report = Report::new();
        report.add_source(SourceSummary {
            name: "a.twbx".into(),
            sha256: "00".into(),
            status: SourceStatus::Extracted,
            records: 3,
        });
        report.add_source(SourceSummary {
            name: "b.twbx".into(),
            sha256: "11".into(),
            status: SourceStatus::Failed,
            records: 0,
        });

        assert_eq!(report.summary.files_extracted, 1);
        assert_eq!(report.summary.files_failed, 1);
    }

    #[test]
    fn report_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = Report::new();
        report.save_to_file(&path).unwrap();

        let loaded: Report = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.version, ReportVersion::CURRENT);
        assert!(loaded.sources.is_empty());
    }
}
