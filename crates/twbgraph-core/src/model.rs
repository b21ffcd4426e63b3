//! Workbook object model and the reader seam
//!
//! A reader turns one uploaded blob into a [`Workbook`]. The engine only ever
//! sees this model, so any conforming reader (the bundled Tableau XML reader,
//! an in-memory mock in tests) can drive extraction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A parsed workbook: its data sources in document order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// Data sources in the order the reader exposes them
    pub datasources: Vec<Datasource>,

    /// Worksheet names in document order
    #[serde(default)]
    pub worksheets: Vec<String>,
}

impl Workbook {
    /// Create a workbook from data sources
    pub fn new(datasources: Vec<Datasource>) -> Self {
        Self {
            datasources,
            worksheets: Vec::new(),
        }
    }

    /// Find a data source by its internal name, for in-place updates
    pub fn datasource_mut(&mut self, name: &str) -> Option<&mut Datasource> {
        self.datasources
            .iter_mut()
            .find(|ds| ds.name.as_deref() == Some(name))
    }

    /// Total number of fields across all data sources
    pub fn field_count(&self) -> usize {
        self.datasources.iter().map(|ds| ds.fields.len()).sum()
    }
}

/// A named collection of fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datasource {
    /// Internal name (e.g. "federated.0abc123"); `None` when the file has none
    pub name: Option<String>,

    /// Display caption
    pub caption: Option<String>,

    /// Fields keyed by id, in insertion order
    pub fields: IndexMap<String, Field>,
}

impl Datasource {
    /// Create an empty data source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            caption: None,
            fields: IndexMap::new(),
        }
    }

    /// Set caption
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Add a field, keyed by its id
    ///
    /// A field whose id is already present replaces the old value in place.
    pub fn with_field(mut self, field: Field) -> Self {
        self.insert_field(field);
        self
    }

    /// Insert a field, keeping the original position for a repeated id
    pub fn insert_field(&mut self, field: Field) {
        self.fields.insert(field.id.clone(), field);
    }
}

/// One field of a data source with the attributes the reader exposes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Id as written in the file, usually bracketed (e.g. "[Sales]")
    pub id: String,

    /// Display caption
    pub caption: Option<String>,

    /// Alias that overrides the caption
    pub alias: Option<String>,

    /// Formula, for calculated fields
    pub calculation: Option<String>,

    /// Data type (string, integer, real, ...)
    pub datatype: Option<String>,

    /// Dimension or measure
    pub role: Option<String>,

    /// quantitative, ordinal or nominal
    pub field_type: Option<String>,

    /// Default aggregation (Sum, Avg, ...)
    pub default_aggregation: Option<String>,

    /// Free-text description
    pub description: Option<String>,

    /// Hidden in the data pane
    pub hidden: bool,

    /// Worksheets that use this field, without duplicates
    pub worksheets: Vec<String>,
}

impl Field {
    /// Create a field with just an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set caption
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set calculation formula
    pub fn with_calculation(mut self, formula: impl Into<String>) -> Self {
        self.calculation = Some(formula.into());
        self
    }

    /// Set field type (quantitative, ordinal, nominal)
    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    /// Display name: alias, then caption, then id
    pub fn name(&self) -> &str {
        self.alias
            .as_deref()
            .filter(|a| !a.is_empty())
            .or_else(|| self.caption.as_deref().filter(|c| !c.is_empty()))
            .unwrap_or(&self.id)
    }

    pub fn is_quantitative(&self) -> bool {
        self.field_type.as_deref() == Some("quantitative")
    }

    pub fn is_ordinal(&self) -> bool {
        self.field_type.as_deref() == Some("ordinal")
    }

    pub fn is_nominal(&self) -> bool {
        self.field_type.as_deref() == Some("nominal")
    }

    /// Record that a worksheet uses this field
    pub fn add_worksheet(&mut self, worksheet: &str) {
        if !self.worksheets.iter().any(|w| w == worksheet) {
            self.worksheets.push(worksheet.to_string());
        }
    }
}

/// Errors raised while opening a workbook blob
#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("Failed to read {0}: {1}")]
    Io(String, String),

    #[error("Invalid bundle archive: {0}")]
    Zip(String),

    #[error("Bundle contains no .twb or .tds document")]
    NoWorkbookInBundle,

    #[error("Malformed workbook XML: {0}")]
    Xml(String),

    #[error("Unexpected root element <{0}>")]
    UnexpectedRoot(String),

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },
}

/// Opens one workbook blob into the object model
pub trait WorkbookReader {
    /// Reader name, used in logs
    fn name(&self) -> &'static str;

    /// Parse `bytes` (the contents of the file called `name`)
    fn open(&self, name: &str, bytes: &[u8]) -> Result<Workbook, WorkbookError>;
}
