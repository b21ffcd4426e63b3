//! twbgraph core
//!
//! Core domain model shared by the reader, the engine and the CLI.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod model;
pub mod record;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use model::{Workbook, Datasource, Field, WorkbookReader, WorkbookError};
pub use record::{FieldRecord, RECORD_COLUMNS};
pub use report::{Report, ReportVersion, ReportSummary, SourceStatus, SourceSummary};
pub use config::{Config, ConfigError, ExportFormat, GraphFormat, GraphConfig, ExportConfig, SeverityThreshold};
