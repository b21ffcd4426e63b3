//! Field extraction and dependency graph engine
//!
//! Turns parsed workbooks into a flat record table and derives the
//! field-to-field dependency graph from calculation formulas.

pub mod extractor;
pub mod merger;
pub mod references;
pub mod graph;
pub mod export;
pub mod pipeline;

pub use extractor::{FieldExtractor, ExtractionError};
pub use merger::merge;
pub use references::{field_references, has_unbalanced_brackets};
pub use graph::{DependencyGraph, GraphEdge, GraphOptions, NodeId};
pub use export::ExportError;
pub use pipeline::{process_batch, process_entries, BatchOutcome, FileFailure, InputFile, ReadFailure};
