//! Record and graph serialization
//!
//! Records go out as CSV (header + one row per record) or as a JSON array
//! of objects. The graph goes out as JSON, Graphviz DOT or a plain
//! tab-separated edge list for whatever renders it.

use serde::Serialize;
use std::io::Write;
use twbgraph_core::{ExportFormat, FieldRecord, GraphFormat, RECORD_COLUMNS};

use crate::graph::DependencyGraph;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One exported row, keyed in column order
///
/// The calculation is written twice: `field_calculation_bk` keeps an
/// untouched copy next to the working column.
#[derive(Serialize)]
struct RecordRow<'a> {
    counter: usize,
    datasource_name: Option<&'a str>,
    datasource_caption: Option<&'a str>,
    alias: Option<&'a str>,
    field_calculation: Option<&'a str>,
    field_calculation_bk: Option<&'a str>,
    field_caption: Option<&'a str>,
    field_datatype: Option<&'a str>,
    field_def_agg: Option<&'a str>,
    field_desc: Option<&'a str>,
    field_hidden: bool,
    field_id: &'a str,
    field_is_nominal: bool,
    field_is_ordinal: bool,
    field_is_quantitative: bool,
    field_name: &'a str,
    field_role: Option<&'a str>,
    field_type: Option<&'a str>,
    field_worksheets: &'a [String],
    #[serde(rename = "Source")]
    source: Option<&'a str>,
}

impl<'a> From<&'a FieldRecord> for RecordRow<'a> {
    fn from(r: &'a FieldRecord) -> Self {
        Self {
            counter: r.counter,
            datasource_name: r.datasource_name.as_deref(),
            datasource_caption: r.datasource_caption.as_deref(),
            alias: r.alias.as_deref(),
            field_calculation: r.field_calculation.as_deref(),
            field_calculation_bk: r.field_calculation.as_deref(),
            field_caption: r.field_caption.as_deref(),
            field_datatype: r.field_datatype.as_deref(),
            field_def_agg: r.field_def_agg.as_deref(),
            field_desc: r.field_desc.as_deref(),
            field_hidden: r.field_hidden,
            field_id: &r.field_id,
            field_is_nominal: r.field_is_nominal,
            field_is_ordinal: r.field_is_ordinal,
            field_is_quantitative: r.field_is_quantitative,
            field_name: &r.field_name,
            field_role: r.field_role.as_deref(),
            field_type: r.field_type.as_deref(),
            field_worksheets: &r.field_worksheets,
            source: r.source.as_deref(),
        }
    }
}

/// Write records in the requested format
pub fn write_records<W: Write>(
    records: &[FieldRecord],
    format: ExportFormat,
    writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_csv(records, writer),
        ExportFormat::Json => {
            let rows: Vec<RecordRow<'_>> = records.iter().map(RecordRow::from).collect();
            serde_json::to_writer(writer, &rows)?;
            Ok(())
        }
    }
}

fn write_csv<W: Write>(records: &[FieldRecord], writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(RECORD_COLUMNS)?;

    for record in records {
        let row = RecordRow::from(record);
        let worksheets = serde_json::to_string(row.field_worksheets)?;

        csv.write_record([
            row.counter.to_string().as_str(),
            row.datasource_name.unwrap_or_default(),
            row.datasource_caption.unwrap_or_default(),
            row.alias.unwrap_or_default(),
            row.field_calculation.unwrap_or_default(),
            row.field_calculation_bk.unwrap_or_default(),
            row.field_caption.unwrap_or_default(),
            row.field_datatype.unwrap_or_default(),
            row.field_def_agg.unwrap_or_default(),
            row.field_desc.unwrap_or_default(),
            bool_cell(row.field_hidden),
            row.field_id,
            bool_cell(row.field_is_nominal),
            bool_cell(row.field_is_ordinal),
            bool_cell(row.field_is_quantitative),
            row.field_name,
            row.field_role.unwrap_or_default(),
            row.field_type.unwrap_or_default(),
            worksheets.as_str(),
            row.source.unwrap_or_default(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

fn bool_cell(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Graph in the requested format
pub fn render_graph(graph: &DependencyGraph, format: GraphFormat) -> Result<String, ExportError> {
    match format {
        GraphFormat::Json => graph_to_json(graph),
        GraphFormat::Dot => Ok(graph_to_dot(graph)),
        GraphFormat::Edges => Ok(graph_to_edge_list(graph)),
    }
}

/// `{ "nodes": [...], "edges": [{ "from", "to" }] }`
pub fn graph_to_json(graph: &DependencyGraph) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(graph)?)
}

/// Graphviz digraph, one statement per node and per edge
pub fn graph_to_dot(graph: &DependencyGraph) -> String {
    let mut dot = String::from("digraph field_dependencies {\n    rankdir=LR;\n");

    for node in graph.nodes() {
        dot.push_str(&format!("    {};\n", dot_id(node)));
    }
    for edge in graph.edges() {
        dot.push_str(&format!("    {} -> {};\n", dot_id(&edge.from), dot_id(&edge.to)));
    }

    dot.push_str("}\n");
    dot
}

/// `dependency<TAB>dependent`, one line per edge
///
/// Backslash, tab, newline and carriage return inside names are written as
/// `\\`, `\t`, `\n` and `\r` so every edge stays on one line.
pub fn graph_to_edge_list(graph: &DependencyGraph) -> String {
    graph
        .edges()
        .iter()
        .map(|e| format!("{}\t{}\n", edge_list_field(&e.from), edge_list_field(&e.to)))
        .collect()
}

fn edge_list_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn dot_id(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}
