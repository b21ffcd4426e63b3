//! Diagnostic codes and per-file problem reporting
//!
//! Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they show up in report.json and config overrides.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Extraction
    /// A workbook could not be opened or traversed
    ExtractionFailure,

    /// No file in the batch produced records
    EmptyBatch,

    // Calculation scanning
    /// A calculation has unbalanced square brackets; the lexical scan may be partial
    UnbalancedBrackets,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractionFailure => "EXTRACTION_FAILURE",
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::UnbalancedBrackets => "UNBALANCED_BRACKETS",
        }
    }

    /// Severity used when no override is configured
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ExtractionFailure => Severity::Error,
            Self::EmptyBatch => Severity::Warn,
            Self::UnbalancedBrackets => Severity::Info,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - the file or batch did not produce what was asked
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where a diagnostic points: an input file, and optionally a field inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Input file display name
    pub file: String,

    /// Data source name, when the problem is inside one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,

    /// Field id, when the problem is about one field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Location {
    /// Create a new location with just a file name
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            datasource: None,
            field: None,
        }
    }

    /// Create a location pointing at a field, inside a data source when it is named
    pub fn with_field(
        file: impl Into<String>,
        datasource: Option<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            datasource,
            field: Some(field.into()),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file)?;
        if let Some(ds) = &self.datasource {
            write!(f, " / {}", ds)?;
        }
        if let Some(field) = &self.field {
            write!(f, " / {}", field)?;
        }
        Ok(())
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,

    /// Offending text, e.g. the calculation that failed to scan cleanly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            snippet: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the offending text
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}
