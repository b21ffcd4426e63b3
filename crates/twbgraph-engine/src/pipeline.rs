//! Batch processing: many workbooks in, one record table and graph out
//!
//! Each file is extracted on its own. A file that fails, whether it could not
//! be read or could not be parsed, is reported and skipped; it never stops the
//! rest of the batch, the merge, or the graph.

use sha2::{Digest, Sha256};
use std::path::Path;
use twbgraph_core::{
    Config, Diagnostic, DiagnosticCode, FieldRecord, Location, Report, SourceStatus,
    SourceSummary, WorkbookReader,
};

use crate::extractor::{ExtractionError, FieldExtractor};
use crate::graph::{DependencyGraph, GraphOptions};
use crate::merger::merge;
use crate::references::has_unbalanced_brackets;

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Display name, stamped on records as their source
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, named after its file name
    pub fn read(path: &Path) -> Result<Self, ReadFailure> {
        let name = display_name(path);
        match std::fs::read(path) {
            Ok(bytes) => Ok(Self { name, bytes }),
            Err(error) => Err(ReadFailure { name, error }),
        }
    }

    /// Hex SHA-256 of the contents
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// A file whose bytes could not be read
#[derive(Debug)]
pub struct ReadFailure {
    /// Display name, as [`InputFile::name`] would have been
    pub name: String,
    pub error: std::io::Error,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A file that produced no records
#[derive(Debug)]
pub struct FileFailure {
    pub name: String,
    pub error: ExtractionError,
}

/// Everything one batch run produces
#[derive(Debug)]
pub struct BatchOutcome {
    /// Combined records, in input order
    pub records: Vec<FieldRecord>,

    pub graph: DependencyGraph,

    pub report: Report,

    pub failures: Vec<FileFailure>,
}

impl BatchOutcome {
    /// Whether no file produced records
    pub fn is_empty(&self) -> bool {
        self.report.summary.files_extracted == 0
    }
}

/// Extract every input, merge the successes and build the dependency graph
pub fn process_batch(reader: &dyn WorkbookReader, inputs: &[InputFile], config: &Config) -> BatchOutcome {
    process_entries(reader, inputs.iter().map(Ok), config)
}

/// Same as [`process_batch`], for entries that may have failed to load
///
/// Unreadable entries are reported exactly like files that fail to parse:
/// a failed source, an `EXTRACTION_FAILURE` diagnostic and a [`FileFailure`].
pub fn process_entries<'a, I>(reader: &dyn WorkbookReader, entries: I, config: &Config) -> BatchOutcome
where
    I: IntoIterator<Item = Result<&'a InputFile, &'a ReadFailure>>,
{
    let mut report = Report::new();
    let mut tables = Vec::new();
    let mut failures = Vec::new();
    let mut entry_count = 0;

    for entry in entries {
        entry_count += 1;

        let (name, sha256, result) = match entry {
            Ok(input) => (
                input.name.as_str(),
                input.fingerprint(),
                FieldExtractor::extract_file(reader, &input.name, &input.bytes),
            ),
            Err(unreadable) => (
                unreadable.name.as_str(),
                String::new(),
                Err(ExtractionError::Unreadable(unreadable.error.to_string())),
            ),
        };

        match result {
            Ok(records) => {
                tracing::info!(file = %name, records = records.len(), "extracted workbook");
                report.add_source(SourceSummary {
                    name: name.to_string(),
                    sha256,
                    status: SourceStatus::Extracted,
                    records: records.len(),
                });
                tables.push((name.to_string(), records));
            }
            Err(error) => {
                tracing::warn!(file = %name, error = %error, "failed to extract workbook");
                report.add_diagnostic(
                    diagnostic(config, DiagnosticCode::ExtractionFailure, format!(
                        "Failed to extract {}: {}",
                        name, error
                    ))
                    .with_location(Location::new(name)),
                );
                report.add_source(SourceSummary {
                    name: name.to_string(),
                    sha256,
                    status: SourceStatus::Failed,
                    records: 0,
                });
                failures.push(FileFailure {
                    name: name.to_string(),
                    error,
                });
            }
        }
    }

    if tables.is_empty() {
        report.add_diagnostic(diagnostic(
            config,
            DiagnosticCode::EmptyBatch,
            format!("No workbook produced records ({} input files)", entry_count),
        ));
    }

    let records = merge(tables);

    if config.graph.flag_unbalanced_brackets {
        for record in &records {
            let Some(calculation) = record.calculation() else {
                continue;
            };
            if has_unbalanced_brackets(calculation) {
                report.add_diagnostic(
                    diagnostic(config, DiagnosticCode::UnbalancedBrackets, format!(
                        "Calculation of '{}' has unbalanced brackets; references may be incomplete",
                        record.field_name
                    ))
                    .with_location(Location::with_field(
                        record.source.as_deref().unwrap_or_default(),
                        record.datasource_name.clone(),
                        &record.field_id,
                    ))
                    .with_snippet(calculation),
                );
            }
        }
    }

    let graph = DependencyGraph::build(&records, GraphOptions::from(&config.graph));

    report.summary.records = records.len();
    report.summary.nodes = graph.node_count();
    report.summary.edges = graph.edge_count();

    tracing::info!(
        files = entry_count,
        failed = failures.len(),
        records = records.len(),
        calculated = records.iter().filter(|r| r.is_calculated()).count(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "batch complete"
    );

    BatchOutcome {
        records,
        graph,
        report,
        failures,
    }
}

fn diagnostic(config: &Config, code: DiagnosticCode, message: String) -> Diagnostic {
    Diagnostic::new(code, config.severity.get_severity(code), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use twbgraph_core::{Datasource, Field, Severity, Workbook, WorkbookError};

    /// Reader serving prepared workbooks by file name
    struct MockReader {
        workbooks: HashMap<String, Workbook>,
    }

    impl MockReader {
        fn new() -> Self {
            Self {
                workbooks: HashMap::new(),
            }
        }

        fn with(mut self, name: &str, workbook: Workbook) -> Self {
            self.workbooks.insert(name.to_string(), workbook);
            self
        }
    }

    impl WorkbookReader for MockReader {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn open(&self, name: &str, _bytes: &[u8]) -> Result<Workbook, WorkbookError> {
            self.workbooks
                .get(name)
                .cloned()
                .ok_or(WorkbookError::NoWorkbookInBundle)
        }
    }

    fn input(name: &str) -> InputFile {
        InputFile::new(name, name.as_bytes().to_vec())
    }

    fn workbook_a() -> Workbook {
        Workbook::new(vec![Datasource::new("ds")
            .with_field(Field::new("[X]").with_caption("X"))
            .with_field(Field::new("[Y]").with_caption("Y").with_calculation("[X]+1"))])
    }

    fn workbook_b() -> Workbook {
        Workbook::new(vec![Datasource::new("other").with_field(Field::new("[X]").with_caption("X"))])
    }

    #[test]
    fn merges_two_files_into_one_graph() {
        let reader = MockReader::new().with("a.twbx", workbook_a()).with("b.twbx", workbook_b());
        let outcome = process_batch(&reader, &[input("a.twbx"), input("b.twbx")], &Config::default());

        assert_eq!(outcome.records.len(), 3);
        let nodes: Vec<&str> = outcome.graph.nodes().map(String::as_str).collect();
        assert_eq!(nodes, vec!["X", "Y"]);
        assert_eq!(outcome.graph.edge_count(), 1);
        assert_eq!(outcome.graph.edges()[0].from, "X");
        assert_eq!(outcome.graph.edges()[0].to, "Y");

        let zero_counters: Vec<&str> = outcome
            .records
            .iter()
            .filter(|r| r.counter == 0)
            .filter_map(|r| r.source.as_deref())
            .collect();
        assert_eq!(zero_counters, vec!["a.twbx", "b.twbx"]);
        assert!(!outcome.report.has_errors());
    }

    #[test]
    fn failed_file_is_isolated() {
        let reader = MockReader::new().with("good.twbx", workbook_a());
        let outcome = process_batch(
            &reader,
            &[input("broken.twbx"), input("good.twbx")],
            &Config::default(),
        );

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].name, "broken.twbx");

        let summary = &outcome.report.summary;
        assert_eq!(summary.files_extracted, 1);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.errors, 1);

        let diag = &outcome.report.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::ExtractionFailure);
        assert_eq!(diag.location.as_ref().unwrap().file, "broken.twbx");
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        let outcome = process_batch(&MockReader::new(), &[], &Config::default());

        assert!(outcome.is_empty());
        assert!(outcome.records.is_empty());
        assert!(outcome.graph.is_empty());
        assert!(outcome.graph.edges().is_empty());
        assert!(!outcome.report.has_errors());
        assert_eq!(outcome.report.diagnostics[0].code, DiagnosticCode::EmptyBatch);
        assert_eq!(outcome.report.diagnostics[0].severity, Severity::Warn);
    }

    #[test]
    fn all_files_failing_yields_empty_graph() {
        let outcome = process_batch(&MockReader::new(), &[input("a.twbx"), input("b.twbx")], &Config::default());

        assert!(outcome.records.is_empty());
        assert!(outcome.graph.is_empty());
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.report.summary.errors, 2);
        assert_eq!(outcome.report.summary.warnings, 1);
    }

    #[test]
    fn severity_override_applies() {
        let mut config = Config::default();
        config.severity.set_override(DiagnosticCode::ExtractionFailure, Severity::Warn);

        let outcome = process_batch(&MockReader::new(), &[input("a.twbx")], &config);
        assert!(!outcome.report.has_errors());
    }

    #[test]
    fn unbalanced_brackets_are_flagged() {
        let wb = Workbook::new(vec![Datasource::new("ds")
            .with_field(Field::new("[Odd]").with_calculation("[A] + [B"))]);
        let reader = MockReader::new().with("odd.twb", wb);

        let outcome = process_batch(&reader, &[input("odd.twb")], &Config::default());
        let diag = outcome
            .report
            .diagnostics
            .iter()
            .find(|d| d.code == DiagnosticCode::UnbalancedBrackets)
            .unwrap();

        assert_eq!(diag.severity, Severity::Info);
        assert_eq!(diag.snippet.as_deref(), Some("[A] + [B"));
        assert_eq!(diag.location.as_ref().unwrap().field.as_deref(), Some("[Odd]"));
        // the scan still found the one well-formed reference
        assert_eq!(outcome.graph.edge_count(), 1);

        let mut quiet = Config::default();
        quiet.graph.flag_unbalanced_brackets = false;
        let outcome = process_batch(&reader, &[input("odd.twb")], &quiet);
        assert!(outcome.report.diagnostics.is_empty());
    }

    #[test]
    fn unreadable_entry_is_a_failed_source() {
        let reader = MockReader::new().with("good.twbx", workbook_a());
        let good = input("good.twbx");
        let locked = ReadFailure {
            name: "locked.twbx".to_string(),
            error: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        };

        let outcome = process_entries(&reader, [Err(&locked), Ok(&good)], &Config::default());

        let statuses: Vec<(&str, SourceStatus)> = outcome
            .report
            .sources
            .iter()
            .map(|s| (s.name.as_str(), s.status))
            .collect();
        assert_eq!(
            statuses,
            vec![("locked.twbx", SourceStatus::Failed), ("good.twbx", SourceStatus::Extracted)]
        );
        assert_eq!(outcome.report.sources[0].sha256, "");
        assert_eq!(outcome.report.summary.files_failed, 1);
        assert_eq!(outcome.report.summary.errors, 1);
        assert_eq!(outcome.records.len(), 2);

        assert_eq!(outcome.failures[0].name, "locked.twbx");
        assert!(matches!(outcome.failures[0].error, ExtractionError::Unreadable(_)));

        let diag = &outcome.report.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::ExtractionFailure);
        assert_eq!(diag.location.as_ref().unwrap().file, "locked.twbx");
        assert!(diag.message.contains("permission denied"));
    }

    #[test]
    fn only_unreadable_entries_count_toward_empty_batch() {
        let locked = ReadFailure {
            name: "locked.twbx".to_string(),
            error: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        };

        let outcome = process_entries(&MockReader::new(), [Err(&locked)], &Config::default());

        assert!(outcome.is_empty());
        assert_eq!(outcome.report.summary.files_failed, 1);
        let empty = outcome
            .report
            .diagnostics
            .iter()
            .find(|d| d.code == DiagnosticCode::EmptyBatch)
            .unwrap();
        assert_eq!(empty.message, "No workbook produced records (1 input files)");
    }

    #[test]
    fn read_names_files_after_their_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.twb");
        std::fs::write(&path, b"<workbook/>").unwrap();

        let file = InputFile::read(&path).unwrap();
        assert_eq!(file.name, "sales.twb");
        assert_eq!(file.bytes, b"<workbook/>");

        let missing = InputFile::read(&dir.path().join("gone.twbx")).unwrap_err();
        assert_eq!(missing.name, "gone.twbx");
        assert_eq!(missing.error.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn report_totals_and_fingerprints() {
        let reader = MockReader::new().with("a.twbx", workbook_a());
        let outcome = process_batch(&reader, &[input("a.twbx")], &Config::default());

        let summary = &outcome.report.summary;
        assert_eq!(summary.records, 2);
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.edges, 1);

        let source = &outcome.report.sources[0];
        assert_eq!(source.records, 2);
        assert_eq!(source.sha256.len(), 64);
        assert_eq!(source.sha256, input("a.twbx").fingerprint());
    }
}
