//! Input discovery: files as given, directories walked for workbooks

use anyhow::Result;
use std::path::{Path, PathBuf};
use twbgraph_engine::{InputFile, ReadFailure};
use walkdir::WalkDir;

/// Extensions picked up when walking a directory
const WORKBOOK_EXTENSIONS: [&str; 4] = ["twb", "twbx", "tds", "tdsx"];

/// Expand the command-line paths into a list of files
///
/// Explicit files are kept whatever their extension; directories contribute
/// their workbook files, sorted by path.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_workbook(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();

            tracing::debug!(dir = %path.display(), files = found.len(), "scanned directory");
            files.extend(found);
        } else if path.exists() {
            files.push(path.clone());
        } else {
            return Err(anyhow::anyhow!("Input not found: {}", path.display()));
        }
    }

    Ok(files)
}

/// Read every file, keeping unreadable ones as failed entries
pub fn load(files: &[PathBuf]) -> Vec<Result<InputFile, ReadFailure>> {
    files
        .iter()
        .map(|path| {
            let entry = InputFile::read(path);
            if let Err(failure) = &entry {
                tracing::warn!(file = %path.display(), error = %failure.error, "could not read input");
            }
            entry
        })
        .collect()
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
        .unwrap_or(false)
}
