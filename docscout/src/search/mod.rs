//! Keyword search over documents.
//!
//! Layers, innermost first:
//!
//! 1. [`matcher`] counts literal keyword occurrences in a piece of text and
//!    memoizes compiled matchers for the duration of a run.
//! 2. [`query`] holds the keywords and options, and the AND/OR decision.
//! 3. [`scanner`] drives extraction over one document, tallies counts,
//!    remembers the first location and stops early once every keyword has
//!    been seen.
//! 4. [`engine`] runs the scanner over many documents in bounded batches
//!    with per-file timeouts, progress reporting and cancellation.
//!
//! ```rust,ignore
//! let orchestrator = BatchOrchestrator::new(ScanConfig::default())?;
//! let query = SearchQuery::new("Invoice", Some("2024"))?.with_logic(KeywordLogic::Or);
//! let report = orchestrator
//!     .run(&documents, &query, &NoopObserver, &CancelFlag::new())
//!     .await?;
//! for result in report.sorted_by_occurrences() {
//!     println!("{} ({})", result.document_name(), result.total_occurrences);
//! }
//! ```
pub mod engine;
pub mod matcher;
pub mod query;
pub mod scanner;

pub use engine::{BatchOrchestrator, CancelFlag, NoopObserver, ScanObserver};
pub use matcher::PatternMatcher;
pub use query::{decide, KeywordLogic, SearchQuery, TypeFilter};
pub use scanner::{FileScanner, SizeLimits};
