/// Document selection: which files on disk are handed to the scanner.
///
/// Only workbooks (`xlsx`, `xls`) and PDFs are ever selected. Office lock
/// files (`~$Budget.xlsx`) are skipped, as are paths matching any of the
/// user's glob ignore patterns. The type filter of a query is applied later,
/// by the orchestrator, so that skipped documents still count toward the
/// selected total.
use glob::Pattern;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::document::{DocumentHandle, DocumentKind};

/// Extensions of tabular documents
pub const TABULAR_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Extensions of page-text documents
pub const PAGE_TEXT_EXTENSIONS: &[&str] = &["pdf"];

/// Maps a path's extension to the kind of document it holds
pub fn document_kind(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?;
    if TABULAR_EXTENSIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(ext))
    {
        Some(DocumentKind::Tabular)
    } else if PAGE_TEXT_EXTENSIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(ext))
    {
        Some(DocumentKind::PageText)
    } else {
        None
    }
}

/// Checks for the owner files Office leaves next to open workbooks
pub fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"))
}

/// Checks if a file should be ignored based on ignore patterns
pub fn should_ignore(path: &Path, ignore_patterns: &[String]) -> bool {
    let normalized_path = path.to_string_lossy().replace('\\', "/");

    ignore_patterns.iter().any(|pattern| match Pattern::new(pattern) {
        Ok(p) => p.matches(&normalized_path),
        Err(e) => {
            debug!("Skipping invalid ignore pattern '{}': {}", pattern, e);
            false
        }
    })
}

/// Determines if a file should be selected for scanning
pub fn should_include_file(path: &Path, ignore_patterns: &[String]) -> bool {
    document_kind(path).is_some() && !is_lock_file(path) && !should_ignore(path, ignore_patterns)
}

/// Walks `root` and returns a handle for every supported document.
///
/// Hidden files and `.gitignore`d paths are not special: users keep
/// spreadsheets in all sorts of places. Entries that cannot be read are
/// logged and skipped.
pub fn collect_documents(
    root: &Path,
    include_subfolders: bool,
    ignore_patterns: &[String],
) -> Vec<DocumentHandle> {
    let mut walker = WalkBuilder::new(root);
    walker
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));
    if !include_subfolders {
        walker.max_depth(Some(1));
    }

    let paths: Vec<PathBuf> = walker
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cannot access entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| should_include_file(path, ignore_patterns))
        .collect();

    let documents: Vec<DocumentHandle> = paths
        .iter()
        .filter_map(|path| match DocumentHandle::from_path(path) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot access {}, skipping: {}", path.display(), e);
                None
            }
        })
        .collect();

    debug!(
        "Selected {} documents under {}",
        documents.len(),
        root.display()
    );
    documents
}
