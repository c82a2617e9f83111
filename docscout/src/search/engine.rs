use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::matcher::PatternMatcher;
use super::query::SearchQuery;
use super::scanner::FileScanner;
use crate::config::ScanConfig;
use crate::document::DocumentHandle;
use crate::errors::{FailureKind, ScanError, ScanResult};
use crate::metrics::ScanMetrics;
use crate::results::{MatchResult, RunReport, ScanFailure, ScanProgress};

/// Cooperative cancellation for a run.
///
/// Clones share the flag. The orchestrator checks it before each batch;
/// files already dispatched are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives progress and results while a run is in flight.
///
/// All methods are called from the orchestrator's own task, one at a time,
/// and should return quickly.
pub trait ScanObserver {
    /// Called once before dispatch, then after every eligible file settles
    fn on_progress(&self, _progress: ScanProgress) {}

    /// Called for every matching document as soon as its scan completes
    fn on_match(&self, _result: &MatchResult) {}

    fn on_failure(&self, _failure: &ScanFailure) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Runs a query across many documents.
///
/// Documents are scanned in fixed-size batches: every document of a batch is
/// started at once, each is raced against the per-file timeout, and the
/// next batch starts only after the whole batch has settled. A failing or
/// slow document never affects its batch-mates.
///
/// Every call to [`BatchOrchestrator::run`] gets its own matcher cache and
/// counters, dropped when the run ends, so runs never see each other's
/// state and can proceed side by side.
#[derive(Debug)]
pub struct BatchOrchestrator {
    config: ScanConfig,
}

impl BatchOrchestrator {
    /// Creates an orchestrator, rejecting unusable configuration up front
    pub fn new(config: ScanConfig) -> ScanResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scans `documents` for `query`.
    ///
    /// Only configuration problems fail the run; per-document problems are
    /// collected in the report. Matches appear in completion order, which is
    /// not stable between runs.
    pub async fn run(
        &self,
        documents: &[DocumentHandle],
        query: &SearchQuery,
        observer: &dyn ScanObserver,
        cancel: &CancelFlag,
    ) -> ScanResult<RunReport> {
        let started = Instant::now();
        let metrics = ScanMetrics::new();
        let matcher = PatternMatcher::with_metrics(metrics.clone());

        // Compile up front so a bad keyword aborts before any file is touched
        matcher.compile(query.keyword1(), query.whole_word, query.case_sensitive)?;
        if let Some(keyword2) = query.keyword2() {
            matcher.compile(keyword2, query.whole_word, query.case_sensitive)?;
        }

        let eligible: Vec<&DocumentHandle> = documents
            .iter()
            .filter(|doc| query.type_filter.accepts(doc.kind()))
            .collect();

        let mut report = RunReport::new();
        report.summary.selected = documents.len();
        report.summary.skipped_by_filter = documents.len() - eligible.len();

        info!(
            "Starting scan of {} documents ({} skipped by type filter) for {:?}{}",
            eligible.len(),
            report.summary.skipped_by_filter,
            query.keyword1(),
            query
                .keyword2()
                .map(|k| format!(" {} {:?}", query.logic, k))
                .unwrap_or_default()
        );

        let mut progress = ScanProgress {
            processed: report.summary.skipped_by_filter,
            total: documents.len(),
        };
        observer.on_progress(progress);

        let scanner = FileScanner::from_config(&self.config, matcher, metrics.clone());
        let timeout = self.config.per_file_timeout();
        let batch_size = self.config.concurrency.get();

        for (index, batch) in eligible.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                let dispatched = index * batch_size;
                report.summary.cancelled = true;
                report.summary.not_dispatched = eligible.len() - dispatched;
                info!(
                    "Scan cancelled, {} documents not dispatched",
                    report.summary.not_dispatched
                );
                break;
            }
            debug!("Dispatching batch {} with {} documents", index + 1, batch.len());

            let mut in_flight: FuturesUnordered<_> = batch
                .iter()
                .map(|doc| {
                    let scanner = &scanner;
                    async move { (*doc, scan_with_deadline(scanner, doc, query, timeout).await) }
                })
                .collect();

            while let Some((doc, outcome)) = in_flight.next().await {
                match outcome {
                    Ok(result) => {
                        if result.is_match {
                            observer.on_match(&result);
                        }
                        report.add_result(result);
                    }
                    Err(e) => {
                        if e.kind() == FailureKind::Timeout {
                            metrics.record_timeout();
                        }
                        warn!("{}", e);
                        let failure = ScanFailure::new(doc, &e);
                        observer.on_failure(&failure);
                        report.add_failure(failure, self.config.failure_report_limit);
                    }
                }
                progress.processed += 1;
                observer.on_progress(progress);
            }
        }

        report.summary.elapsed = started.elapsed();
        report.stats = metrics.get_stats();
        metrics.log_stats();
        info!(
            "Scan complete in {}: {} scanned, {} matched, {} failed",
            humantime::format_duration(round_to_millis(report.summary.elapsed)),
            report.summary.scanned,
            report.summary.matched,
            report.summary.failed
        );

        Ok(report)
    }
}

/// Races one scan against its deadline. On timeout the scan future is
/// dropped, which releases whatever it had extracted so far.
async fn scan_with_deadline(
    scanner: &FileScanner,
    document: &DocumentHandle,
    query: &SearchQuery,
    timeout: Duration,
) -> ScanResult<MatchResult> {
    match tokio::time::timeout(timeout, scanner.scan(document, query)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ScanError::for_document(
            document.name(),
            ScanError::timeout(timeout),
        )),
    }
}

fn round_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
