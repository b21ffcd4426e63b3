//! Tableau document reader
//!
//! Maps `.twb` / `.tds` XML onto the core object model:
//!
//! - `<datasources>/<datasource>` become data sources, in document order
//! - every `<column>` under a data source becomes a field keyed by its `name`
//! - `<metadata-record class="column">` entries fill in defaults, or add
//!   fields that have no `<column>` element at all
//! - `<worksheet>` dependency blocks record which sheets use which fields

use std::path::Path;

use twbgraph_core::{Datasource, Field, Workbook, WorkbookError, WorkbookReader};

use crate::bundle::{self, BundleDocument};
use crate::xml::{self, Element};

/// Reader for Tableau workbooks, packaged or plain
#[derive(Debug, Clone, Copy, Default)]
pub struct TableauReader;

impl TableauReader {
    pub fn new() -> Self {
        Self
    }

    /// Read and open a workbook from disk
    pub fn open_file(&self, path: &Path) -> Result<Workbook, WorkbookError> {
        let bytes = std::fs::read(path)
            .map_err(|e| WorkbookError::Io(path.display().to_string(), e.to_string()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.open(&name, &bytes)
    }

    fn document_root(&self, name: &str, bytes: &[u8]) -> Result<Element, WorkbookError> {
        if bundle::is_bundle(bytes) {
            let BundleDocument { entry, root } = bundle::locate_document(bytes)?;
            tracing::debug!(file = name, entry = %entry, "opened packaged workbook");
            Ok(root)
        } else {
            xml::parse(bundle::decode(bytes)?)
        }
    }
}

impl WorkbookReader for TableauReader {
    fn name(&self) -> &'static str {
        "tableau"
    }

    fn open(&self, name: &str, bytes: &[u8]) -> Result<Workbook, WorkbookError> {
        let root = self.document_root(name, bytes)?;
        let workbook = read_document(&root)?;

        tracing::debug!(
            file = name,
            datasources = workbook.datasources.len(),
            fields = workbook.field_count(),
            worksheets = workbook.worksheets.len(),
            "read workbook"
        );

        Ok(workbook)
    }
}

/// Build the object model from a document root
fn read_document(root: &Element) -> Result<Workbook, WorkbookError> {
    match root.name.as_str() {
        "workbook" => {
            let mut datasources = Vec::new();
            if let Some(container) = root.child("datasources") {
                for element in container.children_named("datasource") {
                    datasources.push(read_datasource(element)?);
                }
            }

            let mut workbook = Workbook::new(datasources);
            if let Some(container) = root.child("worksheets") {
                for worksheet in container.children_named("worksheet") {
                    apply_worksheet(&mut workbook, worksheet)?;
                }
            }

            Ok(workbook)
        }
        // A standalone .tds file is a single data source
        "datasource" => Ok(Workbook::new(vec![read_datasource(root)?])),
        other => Err(WorkbookError::UnexpectedRoot(other.to_string())),
    }
}

fn read_datasource(element: &Element) -> Result<Datasource, WorkbookError> {
    let mut datasource = Datasource {
        name: element
            .attr("name")
            .or_else(|| element.attr("formatted-name"))
            .map(str::to_string),
        caption: element.attr("caption").map(str::to_string),
        ..Default::default()
    };

    for column in element.descendants_named("column") {
        datasource.insert_field(read_column(column)?);
    }

    for record in element.descendants_named("metadata-record") {
        if record.attr("class") != Some("column") {
            continue;
        }
        apply_metadata_record(&mut datasource, record);
    }

    Ok(datasource)
}

fn read_column(column: &Element) -> Result<Field, WorkbookError> {
    let id = column.attr("name").ok_or_else(|| WorkbookError::MissingAttribute {
        element: "column".to_string(),
        attribute: "name".to_string(),
    })?;

    let attr = |key: &str| column.attr(key).map(str::to_string);

    Ok(Field {
        id: id.to_string(),
        caption: attr("caption"),
        alias: attr("alias"),
        calculation: column
            .child("calculation")
            .and_then(|calc| calc.attr("formula"))
            .map(str::to_string),
        datatype: attr("datatype"),
        role: attr("role"),
        field_type: attr("type"),
        default_aggregation: attr("aggregation"),
        description: column
            .find("desc")
            .map(|desc| desc.text_content().trim().to_string())
            .filter(|text| !text.is_empty()),
        hidden: column.attr("hidden") == Some("true"),
        worksheets: Vec::new(),
    })
}

/// Merge one `<metadata-record class="column">` into the data source
fn apply_metadata_record(datasource: &mut Datasource, record: &Element) {
    let Some(local_name) = record.child_text("local-name").filter(|n| !n.is_empty()) else {
        return;
    };
    let aggregation = record.child_text("aggregation").map(str::to_string);

    if let Some(field) = datasource.fields.get_mut(local_name) {
        if field.default_aggregation.is_none() {
            field.default_aggregation = aggregation;
        }
        return;
    }

    datasource.insert_field(Field {
        id: local_name.to_string(),
        alias: record.child_text("remote-alias").map(str::to_string),
        datatype: record.child_text("local-type").map(str::to_string),
        default_aggregation: aggregation,
        ..Default::default()
    });
}

/// Record the fields a worksheet depends on
fn apply_worksheet(workbook: &mut Workbook, worksheet: &Element) -> Result<(), WorkbookError> {
    let name = worksheet.attr("name").ok_or_else(|| WorkbookError::MissingAttribute {
        element: "worksheet".to_string(),
        attribute: "name".to_string(),
    })?;
    workbook.worksheets.push(name.to_string());

    for dependencies in worksheet.descendants_named("datasource-dependencies") {
        let Some(ds_name) = dependencies.attr("datasource") else {
            continue;
        };
        let Some(datasource) = workbook.datasource_mut(ds_name) else {
            tracing::debug!(worksheet = name, datasource = ds_name, "worksheet references unknown data source");
            continue;
        };

        let columns = dependencies
            .descendants_named("column")
            .into_iter()
            .filter_map(|c| c.attr("name"));
        let instances = dependencies
            .descendants_named("column-instance")
            .into_iter()
            .filter_map(|c| c.attr("column"));

        for field_id in columns.chain(instances) {
            if let Some(field) = datasource.fields.get_mut(field_id) {
                field.add_worksheet(name);
            }
        }
    }

    Ok(())
}
