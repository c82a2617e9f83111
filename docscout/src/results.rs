/// Result types produced by a scan run.
///
/// A [`MatchResult`] is built once per scanned document and never changed
/// afterwards. Failures are kept apart as [`ScanFailure`]s so a run can
/// finish with a mix of both. [`RunReport`] collects everything a caller
/// needs once the run is over.
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::document::{DocumentHandle, DocumentKind};
use crate::errors::{FailureKind, ScanError};
use crate::metrics::ScanStats;

/// Outcome of scanning one document.
///
/// When `stopped_early` is set, scanning stopped as soon as every keyword
/// had been seen, so the occurrence counts only cover the fragments up to
/// that point.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    #[serde(serialize_with = "serialize_document")]
    pub document: DocumentHandle,
    pub is_match: bool,
    pub total_occurrences: usize,
    pub keyword1_occurrences: usize,
    pub keyword2_occurrences: usize,
    pub kind: DocumentKind,
    /// Label of the first fragment where any keyword was found
    pub first_location: Option<String>,
    pub fragments_scanned: usize,
    pub stopped_early: bool,
    /// Set when the document was longer than the page cap
    pub partial: bool,
    /// Recovered problems such as pages that failed to decode
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
struct DocumentSummary<'a> {
    name: &'a str,
    path: Option<&'a std::path::Path>,
    size: u64,
}

fn serialize_document<S: Serializer>(doc: &DocumentHandle, s: S) -> Result<S::Ok, S::Error> {
    DocumentSummary {
        name: doc.name(),
        path: doc.path(),
        size: doc.size(),
    }
    .serialize(s)
}

impl MatchResult {
    pub fn document_name(&self) -> &str {
        self.document.name()
    }

    /// The first location, or a placeholder when nothing was found
    pub fn location_label(&self) -> &str {
        self.first_location.as_deref().unwrap_or("unknown location")
    }
}

/// A document whose scan could not complete
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub document_name: String,
    pub path: Option<PathBuf>,
    pub kind: FailureKind,
    /// Full message, prefixed with the document name
    pub message: String,
}

impl ScanFailure {
    pub fn new(document: &DocumentHandle, error: &ScanError) -> Self {
        Self {
            document_name: document.name().to_string(),
            path: document.path().map(PathBuf::from),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Files processed so far out of the files selected for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
}

impl ScanProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed * 100) / self.total).min(100) as u8
    }
}

/// Counts describing how a run went
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Documents handed to the run
    pub selected: usize,
    /// Documents whose scan finished, with or without a match
    pub scanned: usize,
    pub matched: usize,
    pub failed: usize,
    /// Documents excluded by the query's type filter
    pub skipped_by_filter: usize,
    /// Documents never dispatched because the run was cancelled
    pub not_dispatched: usize,
    pub cancelled: bool,
    /// The first few failure messages, in the order they happened
    pub failure_messages: Vec<String>,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

fn serialize_duration<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&humantime::format_duration(*d).to_string())
}

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Matching documents in the order their scans completed
    pub matches: Vec<MatchResult>,
    pub failures: Vec<ScanFailure>,
    pub summary: RunSummary,
    pub stats: ScanStats,
}

impl RunReport {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a finished scan. Only matching results are kept.
    pub fn add_result(&mut self, result: MatchResult) {
        self.summary.scanned += 1;
        if result.is_match {
            self.summary.matched += 1;
            self.matches.push(result);
        }
    }

    /// Records a failed scan, keeping at most `message_limit` messages in
    /// the summary
    pub fn add_failure(&mut self, failure: ScanFailure, message_limit: usize) {
        self.summary.failed += 1;
        if self.summary.failure_messages.len() < message_limit {
            self.summary.failure_messages.push(failure.message.clone());
        }
        self.failures.push(failure);
    }

    /// Matches ordered by total occurrences, most first
    pub fn sorted_by_occurrences(&self) -> Vec<&MatchResult> {
        let mut sorted: Vec<&MatchResult> = self.matches.iter().collect();
        sorted.sort_by(|a, b| {
            b.total_occurrences
                .cmp(&a.total_occurrences)
                .then_with(|| a.document_name().cmp(b.document_name()))
        });
        sorted
    }
}
