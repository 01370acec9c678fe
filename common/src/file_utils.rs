//! File utility functions for listing and filtering files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Supported TIFF image file extensions.
pub const TIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// True if the path has one of `extensions`, compared case-insensitively.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Returns paths to all files under `root` matching the given extensions, sorted.
///
/// Unreadable directory entries are skipped with a warning.
pub fn files_with_extensions_recursive(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
