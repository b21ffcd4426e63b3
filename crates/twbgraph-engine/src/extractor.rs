//! Field metadata extraction
//!
//! Flattens a parsed workbook into one [`FieldRecord`] per field per data
//! source. The counter runs across the whole workbook and never resets
//! between data sources.

use twbgraph_core::{Datasource, Field, FieldRecord, Workbook, WorkbookError, WorkbookReader};

/// Errors that stop extraction of a single file
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to read file: {0}")]
    Unreadable(String),

    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}

/// Extract flattened field records from workbooks
pub struct FieldExtractor;

impl FieldExtractor {
    /// Open `bytes` with `reader` and extract its records
    pub fn extract_file(
        reader: &dyn WorkbookReader,
        name: &str,
        bytes: &[u8],
    ) -> Result<Vec<FieldRecord>, ExtractionError> {
        tracing::debug!(file = name, reader = reader.name(), size = bytes.len(), "opening workbook");
        let workbook = reader.open(name, bytes)?;
        Ok(Self::extract(&workbook))
    }

    /// Extract records in data source order, then field order
    ///
    /// Every field is emitted. A data source without a name still contributes
    /// its fields, with the data source columns left empty.
    pub fn extract(workbook: &Workbook) -> Vec<FieldRecord> {
        let mut records = Vec::with_capacity(workbook.field_count());
        let mut counter = 0;

        for datasource in &workbook.datasources {
            let (name, caption) = Self::datasource_labels(datasource);
            if name.is_none() {
                tracing::debug!(fields = datasource.fields.len(), "data source has no name");
            }

            for field in datasource.fields.values() {
                records.push(Self::flatten(counter, name, caption, field));
                counter += 1;
            }
        }

        records
    }

    /// Name and caption of a data source; caption falls back to name
    fn datasource_labels(datasource: &Datasource) -> (Option<&str>, Option<&str>) {
        let name = datasource.name.as_deref().filter(|n| !n.is_empty());
        let caption = datasource
            .caption
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(name);
        (name, caption)
    }

    fn flatten(
        counter: usize,
        datasource_name: Option<&str>,
        datasource_caption: Option<&str>,
        field: &Field,
    ) -> FieldRecord {
        FieldRecord {
            counter,
            datasource_name: datasource_name.map(str::to_string),
            datasource_caption: datasource_caption.map(str::to_string),
            alias: field.alias.clone(),
            field_calculation: field.calculation.clone(),
            field_caption: field.caption.clone(),
            field_datatype: field.datatype.clone(),
            field_def_agg: field.default_aggregation.clone(),
            field_desc: field.description.clone(),
            field_hidden: field.hidden,
            field_id: field.id.clone(),
            field_is_nominal: field.is_nominal(),
            field_is_ordinal: field.is_ordinal(),
            field_is_quantitative: field.is_quantitative(),
            field_name: field.name().to_string(),
            field_role: field.role.clone(),
            field_type: field.field_type.clone(),
            field_worksheets: field.worksheets.clone(),
            source: None,
        }
    }
}
