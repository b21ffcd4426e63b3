//! Packaged workbook (`.twbx` / `.tdsx`) handling
//!
//! A bundle is a zip archive holding the workbook document next to data
//! extracts and images. Only the document matters here.

use std::io::{Cursor, Read};
use std::path::Path;

use twbgraph_core::WorkbookError;
use zip::ZipArchive;

use crate::xml::{self, Element};

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// Extensions of archive entries that hold a workbook or data source document
const DOCUMENT_EXTENSIONS: [&str; 2] = ["twb", "tds"];

/// The document found inside a bundle
#[derive(Debug, Clone)]
pub struct BundleDocument {
    /// Archive entry name (e.g. "Superstore.twb")
    pub entry: String,

    /// Parsed root element
    pub root: Element,
}

/// Whether the bytes look like a zip archive
pub fn is_bundle(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_SIGNATURE)
}

/// Find the first `.twb` / `.tds` entry that parses as XML
///
/// Entries are tried in archive order; one that fails to parse is skipped.
pub fn locate_document(bytes: &[u8]) -> Result<BundleDocument, WorkbookError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| WorkbookError::Zip(e.to_string()))?;

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| WorkbookError::Zip(e.to_string()))?;

        let entry = file.name().to_string();
        if !is_document_entry(&entry) {
            continue;
        }

        let mut contents = Vec::new();
        if let Err(e) = file.read_to_end(&mut contents) {
            tracing::warn!(entry = %entry, error = %e, "skipping unreadable bundle entry");
            continue;
        }

        match decode(&contents).and_then(xml::parse) {
            Ok(root) => {
                tracing::debug!(entry = %entry, "found workbook document in bundle");
                return Ok(BundleDocument { entry, root });
            }
            Err(e) => {
                tracing::debug!(entry = %entry, error = %e, "bundle entry is not a workbook document");
            }
        }
    }

    Err(WorkbookError::NoWorkbookInBundle)
}

/// Decode document bytes as UTF-8, dropping a byte order mark
pub(crate) fn decode(bytes: &[u8]) -> Result<&str, WorkbookError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes).map_err(|e| WorkbookError::Xml(format!("document is not UTF-8: {}", e)))
}

fn is_document_entry(entry: &str) -> bool {
    Path::new(entry)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| DOCUMENT_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn bundle(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn detects_zip_signature() {
        assert!(is_bundle(&bundle(&[("a.twb", "<workbook/>")])));
        assert!(!is_bundle(b"<workbook/>"));
    }

    #[test]
    fn locates_workbook_entry() {
        let bytes = bundle(&[
            ("Data/Extracts/sales.hyper", "binary"),
            ("Sales.twb", "<workbook><datasources/></workbook>"),
        ]);

        let doc = locate_document(&bytes).unwrap();
        assert_eq!(doc.entry, "Sales.twb");
        assert_eq!(doc.root.name, "workbook");
    }

    #[test]
    fn skips_unparseable_candidates() {
        let bytes = bundle(&[
            ("broken.twb", "<workbook>"),
            ("good.tds", "<datasource name='x'/>"),
        ]);

        let doc = locate_document(&bytes).unwrap();
        assert_eq!(doc.entry, "good.tds");
    }

    #[test]
    fn bundle_without_document() {
        let bytes = bundle(&[("Image/logo.png", "png")]);
        assert!(matches!(locate_document(&bytes), Err(WorkbookError::NoWorkbookInBundle)));
    }

    #[test]
    fn truncated_archive() {
        let mut bytes = bundle(&[("a.twb", "<workbook/>")]);
        bytes.truncate(10);
        assert!(matches!(locate_document(&bytes), Err(WorkbookError::Zip(_))));
    }

    #[test]
    fn decode_strips_bom() {
        assert_eq!(decode(b"\xEF\xBB\xBF<a/>").unwrap(), "<a/>");
        assert!(decode(&[0xff, 0xfe, 0x00]).is_err());
    }
}
