//! Text extraction from raw document bytes.
//!
//! An extractor turns the bytes of one document into a lazy sequence of
//! [`TextFragment`]s: one per non-empty cell for workbooks, one per page for
//! PDFs. Only one unit (a sheet or a page) is decoded at a time, so the text
//! of a whole document is never held in a single string.
//!
//! Items are `ScanResult<TextFragment>`. An `Err` item is recoverable: the
//! caller may skip it and keep iterating. Unrecoverable problems surface
//! from [`DocumentExtractor::open`] instead.

pub mod pdf;
pub mod tabular;

use serde::Serialize;
use std::fmt;

pub use pdf::PdfExtractor;
pub use tabular::TabularExtractor;

use crate::document::DocumentKind;
use crate::errors::ScanResult;

/// Default cap on the number of PDF pages scanned per document
pub const DEFAULT_MAX_PAGES: usize = 500;

/// Where a fragment came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FragmentLocation {
    /// Zero-based row and column within the named sheet
    Cell {
        sheet: String,
        row: u32,
        column: u32,
    },
    /// One-based page number
    Page(u32),
}

impl fmt::Display for FragmentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentLocation::Cell { sheet, row, column } => write!(
                f,
                "Sheet: {}, Cell: {}{}",
                sheet,
                column_letter(*column as usize),
                row + 1
            ),
            FragmentLocation::Page(page) => write!(f, "Page {}", page),
        }
    }
}

/// A span of extracted text and its location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    pub text: String,
    pub location: FragmentLocation,
}

/// Converts a zero-based column index to spreadsheet letters
/// (`0 -> A`, `25 -> Z`, `26 -> AA`).
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Bounds applied while extracting
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    pub max_pages: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Extractor for either kind of document
pub enum DocumentExtractor {
    Tabular(TabularExtractor),
    PageText(PdfExtractor),
}

impl DocumentExtractor {
    /// Parses `bytes` as a document of the given kind.
    ///
    /// Fails with `ScanError::ParseError` when the bytes are not a valid
    /// workbook or PDF.
    pub fn open(kind: DocumentKind, bytes: Vec<u8>, limits: ExtractLimits) -> ScanResult<Self> {
        match kind {
            DocumentKind::Tabular => Ok(Self::Tabular(TabularExtractor::open(bytes)?)),
            DocumentKind::PageText => Ok(Self::PageText(PdfExtractor::open(
                &bytes,
                limits.max_pages,
            )?)),
        }
    }

    /// True when the document had more units than the extractor will visit
    pub fn is_partial(&self) -> bool {
        match self {
            DocumentExtractor::Tabular(_) => false,
            DocumentExtractor::PageText(pdf) => pdf.is_truncated(),
        }
    }

    /// Non-fatal problems noticed so far, drained on each call
    pub fn take_warnings(&mut self) -> Vec<String> {
        match self {
            DocumentExtractor::Tabular(tabular) => tabular.take_warnings(),
            DocumentExtractor::PageText(pdf) => pdf.take_warnings(),
        }
    }
}

impl Iterator for DocumentExtractor {
    type Item = ScanResult<TextFragment>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            DocumentExtractor::Tabular(tabular) => tabular.next(),
            DocumentExtractor::PageText(pdf) => pdf.next(),
        }
    }
}
