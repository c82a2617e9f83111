pub mod config;
pub mod document;
pub mod errors;
pub mod extract;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::ScanConfig;
pub use document::{ByteSource, DocumentHandle, DocumentKind};
pub use errors::{FailureKind, ScanError, ScanResult};
pub use results::{MatchResult, RunReport, RunSummary, ScanFailure, ScanProgress};
pub use search::{
    BatchOrchestrator, CancelFlag, KeywordLogic, NoopObserver, ScanObserver, SearchQuery,
    TypeFilter,
};
