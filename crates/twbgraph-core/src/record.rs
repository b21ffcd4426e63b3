//! Flattened field metadata, one row per field per data source

use serde::{Deserialize, Serialize};

/// Column order of the exported record table
pub const RECORD_COLUMNS: [&str; 20] = [
    "counter",
    "datasource_name",
    "datasource_caption",
    "alias",
    "field_calculation",
    "field_calculation_bk",
    "field_caption",
    "field_datatype",
    "field_def_agg",
    "field_desc",
    "field_hidden",
    "field_id",
    "field_is_nominal",
    "field_is_ordinal",
    "field_is_quantitative",
    "field_name",
    "field_role",
    "field_type",
    "field_worksheets",
    "Source",
];

/// One field of one data source, flattened
///
/// `counter` is an ordinal within a single file's extraction pass. After
/// merging several files the same counter can appear once per `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub counter: usize,

    /// Absent when the data source carries neither a name nor a formatted name
    pub datasource_name: Option<String>,
    pub datasource_caption: Option<String>,
    pub alias: Option<String>,
    pub field_calculation: Option<String>,
    pub field_caption: Option<String>,
    pub field_datatype: Option<String>,
    pub field_def_agg: Option<String>,
    pub field_desc: Option<String>,
    pub field_hidden: bool,
    pub field_id: String,
    pub field_is_nominal: bool,
    pub field_is_ordinal: bool,
    pub field_is_quantitative: bool,

    /// Node identity in the dependency graph
    pub field_name: String,
    pub field_role: Option<String>,
    pub field_type: Option<String>,
    pub field_worksheets: Vec<String>,

    /// Originating file, stamped by the merger
    #[serde(rename = "Source")]
    pub source: Option<String>,
}

impl FieldRecord {
    /// Calculation text, if the field has a non-empty one
    pub fn calculation(&self) -> Option<&str> {
        self.field_calculation.as_deref().filter(|c| !c.is_empty())
    }

    /// Whether this record describes a calculated field
    pub fn is_calculated(&self) -> bool {
        self.calculation().is_some()
    }

    /// Same record stamped with its originating file
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(calculation: Option<&str>) -> FieldRecord {
        FieldRecord {
            counter: 0,
            datasource_name: Some("ds".to_string()),
            datasource_caption: Some("ds".to_string()),
            alias: None,
            field_calculation: calculation.map(str::to_string),
            field_caption: None,
            field_datatype: None,
            field_def_agg: None,
            field_desc: None,
            field_hidden: false,
            field_id: "[X]".to_string(),
            field_is_nominal: false,
            field_is_ordinal: false,
            field_is_quantitative: false,
            field_name: "X".to_string(),
            field_role: None,
            field_type: None,
            field_worksheets: Vec::new(),
            source: None,
        }
    }

    #[test]
    fn empty_calculation_is_not_calculated() {
        assert!(!record(None).is_calculated());
        assert!(!record(Some("")).is_calculated());
        assert!(record(Some("[A] + 1")).is_calculated());
    }

    #[test]
    fn source_serializes_capitalized() {
        let json = serde_json::to_value(record(None).with_source("a.twbx")).unwrap();
        assert_eq!(json["Source"], "a.twbx");
        assert!(json.get("source").is_none());
    }

    #[test]
    fn column_list_ends_with_source() {
        assert_eq!(RECORD_COLUMNS[0], "counter");
        assert_eq!(RECORD_COLUMNS[RECORD_COLUMNS.len() - 1], "Source");
    }
}
