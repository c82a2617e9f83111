use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::matcher::{MatchStrategy, PatternMatcher};
use super::query::SearchQuery;
use crate::config::ScanConfig;
use crate::document::{DocumentHandle, DocumentKind};
use crate::errors::{ScanError, ScanResult};
use crate::extract::{DocumentExtractor, ExtractLimits, TextFragment};
use crate::metrics::ScanMetrics;
use crate::results::MatchResult;

/// Size guards applied before a document is read
#[derive(Debug, Clone, Copy)]
pub struct SizeLimits {
    pub max_tabular_bytes: u64,
    pub max_page_text_bytes: u64,
}

impl SizeLimits {
    pub fn for_kind(&self, kind: DocumentKind) -> u64 {
        match kind {
            DocumentKind::Tabular => self.max_tabular_bytes,
            DocumentKind::PageText => self.max_page_text_bytes,
        }
    }
}

/// Running totals for one keyword within one document
#[derive(Debug, Default)]
struct KeywordTally {
    found: bool,
    occurrences: usize,
}

impl KeywordTally {
    fn add(&mut self, count: usize) -> bool {
        if count > 0 {
            self.found = true;
            self.occurrences += count;
        }
        count > 0
    }
}

/// Everything learned from walking one document's fragments
#[derive(Debug, Default)]
struct Tally {
    keyword1: KeywordTally,
    keyword2: KeywordTally,
    first_location: Option<String>,
    fragments_scanned: usize,
    pages_failed: usize,
    stopped_early: bool,
    partial: bool,
    warnings: Vec<String>,
}

/// Raises the abort flag when dropped.
///
/// The scan future owns one of these, so when a deadline drops the future
/// the detached extraction sees the flag at its next fragment and stops.
struct AbortOnDrop(Arc<AtomicBool>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// The compiled keywords and options one extraction needs
struct Keywords<'a> {
    keyword1: &'a MatchStrategy,
    keyword2: Option<&'a MatchStrategy>,
    query: &'a SearchQuery,
}

/// Walks `fragments`, counting keyword occurrences until the stream ends,
/// both keywords have been seen, or `abort` is raised.
///
/// Pages that fail to decode are skipped and recorded as warnings. If every
/// page failed, the document as a whole is a parse error.
fn tally_fragments<I>(
    fragments: I,
    keywords: &Keywords<'_>,
    metrics: &ScanMetrics,
    name: &str,
    abort: &AtomicBool,
) -> ScanResult<Tally>
where
    I: Iterator<Item = ScanResult<TextFragment>>,
{
    let mut tally = Tally::default();

    for item in fragments {
        if abort.load(Ordering::Relaxed) {
            trace!("{}: abandoned after {} fragments", name, tally.fragments_scanned);
            break;
        }

        let fragment = match item {
            Ok(fragment) => fragment,
            Err(ScanError::PageDecode { page, message }) => {
                warn!(
                    "{}: skipping page {} that failed to decode: {}",
                    name, page, message
                );
                metrics.record_page_recovered();
                tally.pages_failed += 1;
                tally
                    .warnings
                    .push(format!("Page {} skipped: {}", page, message));
                continue;
            }
            Err(e) => return Err(e),
        };

        tally.fragments_scanned += 1;
        metrics.record_fragment();

        let hit1 = tally.keyword1.add(keywords.keyword1.count(&fragment.text));
        let hit2 = match keywords.keyword2 {
            Some(k) => tally.keyword2.add(k.count(&fragment.text)),
            None => false,
        };

        if (hit1 || hit2) && tally.first_location.is_none() {
            tally.first_location = Some(fragment.location.to_string());
        }

        if keywords
            .query
            .is_settled(tally.keyword1.found, tally.keyword2.found)
        {
            trace!(
                "{}: all keywords found at {}, stopping early",
                name,
                fragment.location
            );
            metrics.record_early_exit();
            tally.stopped_early = true;
            break;
        }
    }

    if tally.pages_failed > 0 && tally.fragments_scanned == 0 {
        return Err(ScanError::parse_error(format!(
            "none of the {} pages could be decoded",
            tally.pages_failed
        )));
    }
    Ok(tally)
}

/// One document's parse and tally, run on the blocking pool
struct Extraction {
    name: String,
    kind: DocumentKind,
    bytes: Vec<u8>,
    limits: ExtractLimits,
    keyword1: MatchStrategy,
    keyword2: Option<MatchStrategy>,
    query: SearchQuery,
    metrics: ScanMetrics,
    abort: Arc<AtomicBool>,
}

impl Extraction {
    fn run(self) -> ScanResult<Tally> {
        if self.abort.load(Ordering::Relaxed) {
            return Ok(Tally::default());
        }

        let mut extractor = DocumentExtractor::open(self.kind, self.bytes, self.limits)?;
        let keywords = Keywords {
            keyword1: &self.keyword1,
            keyword2: self.keyword2.as_ref(),
            query: &self.query,
        };
        let mut tally = tally_fragments(
            extractor.by_ref(),
            &keywords,
            &self.metrics,
            &self.name,
            &self.abort,
        )?;
        tally.partial = extractor.is_partial();
        tally.warnings.extend(extractor.take_warnings());
        Ok(tally)
    }
}

/// Scans single documents for the keywords of a query.
///
/// A scanner is cheap to clone and holds no per-document state; each call
/// to [`FileScanner::scan`] owns its own counters and fragment stream.
/// Parsing is synchronous, so it runs on tokio's blocking pool where it
/// cannot hold up the task that enforces deadlines.
#[derive(Debug, Clone)]
pub struct FileScanner {
    matcher: PatternMatcher,
    metrics: ScanMetrics,
    size_limits: SizeLimits,
    extract_limits: ExtractLimits,
}

impl FileScanner {
    pub fn new(
        matcher: PatternMatcher,
        metrics: ScanMetrics,
        size_limits: SizeLimits,
        extract_limits: ExtractLimits,
    ) -> Self {
        Self {
            matcher,
            metrics,
            size_limits,
            extract_limits,
        }
    }

    /// Creates a scanner using the limits from `config`
    pub fn from_config(config: &ScanConfig, matcher: PatternMatcher, metrics: ScanMetrics) -> Self {
        Self::new(
            matcher,
            metrics,
            SizeLimits {
                max_tabular_bytes: config.max_tabular_bytes,
                max_page_text_bytes: config.max_page_text_bytes,
            },
            config.extract_limits(),
        )
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Scans one document.
    ///
    /// Any failure is returned as a single `ScanError::Document` whose
    /// message starts with the document's name. Pages that fail to decode
    /// are skipped and reported in `MatchResult::warnings` instead, unless
    /// no page could be decoded at all.
    ///
    /// Dropping the returned future abandons the scan: the parse running in
    /// the background stops at its next fragment.
    pub async fn scan(
        &self,
        document: &DocumentHandle,
        query: &SearchQuery,
    ) -> ScanResult<MatchResult> {
        self.scan_inner(document, query)
            .await
            .map_err(|e| ScanError::for_document(document.name(), e))
    }

    async fn scan_inner(
        &self,
        document: &DocumentHandle,
        query: &SearchQuery,
    ) -> ScanResult<MatchResult> {
        let kind = document.kind();
        let limit = self.size_limits.for_kind(kind);
        if document.size() > limit {
            return Err(ScanError::file_too_large(kind, document.size(), limit));
        }

        let keyword1 = self
            .matcher
            .compile(query.keyword1(), query.whole_word, query.case_sensitive)?;
        let keyword2: Option<MatchStrategy> = query
            .keyword2()
            .map(|k| self.matcher.compile(k, query.whole_word, query.case_sensitive))
            .transpose()?;

        trace!("Reading {}", document.name());
        let bytes = document.read_bytes().await?;
        self.metrics.record_bytes_read(bytes.len() as u64);

        let abort = Arc::new(AtomicBool::new(false));
        let _abort_guard = AbortOnDrop(abort.clone());
        let extraction = Extraction {
            name: document.name().to_string(),
            kind,
            bytes,
            limits: self.extract_limits,
            keyword1,
            keyword2,
            query: query.clone(),
            metrics: self.metrics.clone(),
            abort,
        };
        let tally = tokio::task::spawn_blocking(move || extraction.run())
            .await
            .map_err(|e| {
                ScanError::parse_error(format!("extraction stopped unexpectedly: {}", e))
            })??;

        let is_match = query.is_match(tally.keyword1.found, tally.keyword2.found);
        debug!(
            "Scanned {}: match={}, occurrences={}+{}, fragments={}",
            document.name(),
            is_match,
            tally.keyword1.occurrences,
            tally.keyword2.occurrences,
            tally.fragments_scanned
        );

        Ok(MatchResult {
            document: document.clone(),
            is_match,
            total_occurrences: tally.keyword1.occurrences + tally.keyword2.occurrences,
            keyword1_occurrences: tally.keyword1.occurrences,
            keyword2_occurrences: tally.keyword2.occurrences,
            kind,
            first_location: tally.first_location,
            fragments_scanned: tally.fragments_scanned,
            stopped_early: tally.stopped_early,
            partial: tally.partial,
            warnings: tally.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::extract::FragmentLocation;

    fn scanner(max_bytes: u64) -> FileScanner {
        FileScanner::new(
            PatternMatcher::new(),
            ScanMetrics::new(),
            SizeLimits {
                max_tabular_bytes: max_bytes,
                max_page_text_bytes: max_bytes,
            },
            ExtractLimits::default(),
        )
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected() {
        let doc = DocumentHandle::from_bytes("huge.xlsx", vec![0u8; 32]).unwrap();
        let query = SearchQuery::new("x", None).unwrap();

        let err = scanner(16).scan(&doc, &query).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::FileTooLarge);
        assert!(err.to_string().starts_with("huge.xlsx: "));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_a_parse_error() {
        let doc = DocumentHandle::from_bytes("broken.pdf", b"not a pdf".to_vec()).unwrap();
        let query = SearchQuery::new("x", None).unwrap();

        let err = scanner(1024).scan(&doc, &query).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
        assert!(err.to_string().starts_with("broken.pdf: Parse error"));
    }

    fn page(number: u32, text: &str) -> ScanResult<TextFragment> {
        Ok(TextFragment {
            text: text.to_string(),
            location: FragmentLocation::Page(number),
        })
    }

    fn tally(
        fragments: Vec<ScanResult<TextFragment>>,
        query: &SearchQuery,
        metrics: &ScanMetrics,
        abort: &AtomicBool,
    ) -> ScanResult<Tally> {
        let matcher = PatternMatcher::new();
        let keyword1 = matcher.compile(query.keyword1(), false, false).unwrap();
        let keyword2 = query
            .keyword2()
            .map(|k| matcher.compile(k, false, false).unwrap());
        let keywords = Keywords {
            keyword1: &keyword1,
            keyword2: keyword2.as_ref(),
            query,
        };
        tally_fragments(fragments.into_iter(), &keywords, metrics, "doc.pdf", abort)
    }

    #[test]
    fn test_undecodable_page_is_skipped() {
        let metrics = ScanMetrics::new();
        let query = SearchQuery::new("needle", None).unwrap();
        let fragments = vec![
            page(1, "nothing here"),
            Err(ScanError::page_decode(2, "bad content stream")),
            page(3, "a needle and another needle"),
        ];

        let tally = tally(fragments, &query, &metrics, &AtomicBool::new(false)).unwrap();
        assert_eq!(tally.fragments_scanned, 2);
        assert_eq!(tally.pages_failed, 1);
        assert_eq!(tally.keyword1.occurrences, 2);
        assert_eq!(tally.first_location.as_deref(), Some("Page 3"));
        assert_eq!(tally.warnings, vec!["Page 2 skipped: bad content stream"]);
        assert_eq!(metrics.get_stats().pages_recovered, 1);
    }

    #[test]
    fn test_every_page_failing_is_a_parse_error() {
        let metrics = ScanMetrics::new();
        let query = SearchQuery::new("needle", None).unwrap();
        let fragments = vec![
            Err(ScanError::page_decode(1, "bad")),
            Err(ScanError::page_decode(2, "bad")),
        ];

        let err = tally(fragments, &query, &metrics, &AtomicBool::new(false)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
        assert_eq!(metrics.get_stats().pages_recovered, 2);
    }

    #[test]
    fn test_raised_abort_stops_the_walk() {
        let metrics = ScanMetrics::new();
        let query = SearchQuery::new("needle", None).unwrap();
        let fragments = vec![page(1, "needle"), page(2, "needle")];

        let tally = tally(fragments, &query, &metrics, &AtomicBool::new(true)).unwrap();
        assert_eq!(tally.fragments_scanned, 0);
        assert!(!tally.keyword1.found);
    }

    #[test]
    fn test_early_exit_needs_both_keywords() {
        let metrics = ScanMetrics::new();
        let query = SearchQuery::new("alpha", Some("beta")).unwrap();
        let fragments = vec![page(1, "alpha"), page(2, "beta"), page(3, "alpha beta")];

        let tally = tally(fragments, &query, &metrics, &AtomicBool::new(false)).unwrap();
        assert!(tally.stopped_early);
        assert_eq!(tally.fragments_scanned, 2);
        assert_eq!(tally.first_location.as_deref(), Some("Page 1"));
    }

    #[test]
    fn test_abort_flag_raised_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = AbortOnDrop(flag.clone());
        assert!(!flag.load(Ordering::Relaxed));
        drop(guard);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_keyword_tally() {
        let mut tally = KeywordTally::default();
        assert!(!tally.add(0));
        assert!(!tally.found);
        assert!(tally.add(2));
        assert!(tally.add(1));
        assert!(tally.found);
        assert_eq!(tally.occurrences, 3);
    }
}
