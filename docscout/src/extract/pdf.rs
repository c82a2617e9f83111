use lopdf::Document;
use tracing::{debug, trace};

use super::{FragmentLocation, TextFragment};
use crate::errors::{ScanError, ScanResult};

/// Extracts PDF text one page at a time, up to a page cap
pub struct PdfExtractor {
    document: Document,
    pages: Vec<u32>,
    next: usize,
    total_pages: usize,
    truncated: bool,
    warnings: Vec<String>,
}

impl PdfExtractor {
    pub fn open(bytes: &[u8], max_pages: usize) -> ScanResult<Self> {
        let document = Document::load_mem(bytes)?;
        if document.is_encrypted() {
            return Err(ScanError::parse_error("PDF is password protected"));
        }

        let all_pages: Vec<u32> = document.get_pages().keys().copied().collect();
        let total_pages = all_pages.len();
        if total_pages == 0 {
            return Err(ScanError::parse_error("PDF has no pages"));
        }

        let truncated = total_pages > max_pages;
        let mut warnings = Vec::new();
        if truncated {
            debug!(
                "PDF has {} pages, only the first {} will be scanned",
                total_pages, max_pages
            );
            warnings.push(format!(
                "Only the first {} of {} pages were scanned",
                max_pages, total_pages
            ));
        }

        Ok(Self {
            document,
            pages: all_pages.into_iter().take(max_pages).collect(),
            next: 0,
            total_pages,
            truncated,
            warnings,
        })
    }

    /// Pages in the document, including any beyond the cap
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Joins the text lines of a page with single spaces
fn normalize_page_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Iterator for PdfExtractor {
    type Item = ScanResult<TextFragment>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = *self.pages.get(self.next)?;
        self.next += 1;

        trace!("Extracting page {}", page);
        let item = match self.document.extract_text(&[page]) {
            Ok(raw) => Ok(TextFragment {
                text: normalize_page_text(&raw),
                location: FragmentLocation::Page(page),
            }),
            Err(e) => Err(ScanError::page_decode(page, e.to_string())),
        };
        Some(item)
    }
}
