//! Tableau workbook reading
//!
//! This crate handles:
//! - Unpacking `.twbx` / `.tdsx` bundles and locating the workbook document
//! - Parsing workbook XML into a small element tree
//! - Mapping data sources, columns, metadata records and worksheet usage
//!   onto the `twbgraph-core` object model

pub mod bundle;
pub mod reader;
pub mod xml;

pub use bundle::{is_bundle, locate_document, BundleDocument};
pub use reader::TableauReader;
pub use xml::Element;
