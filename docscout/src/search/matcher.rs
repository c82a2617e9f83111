use dashmap::DashMap;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::trace;

use crate::errors::{ScanError, ScanResult};
use crate::metrics::ScanMetrics;

/// Upper bound on the compiled size of one keyword matcher
const MATCHER_SIZE_LIMIT: usize = 1 << 20;

/// Cache key: one compiled matcher per distinct keyword and option pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatcherKey {
    pub keyword: String,
    pub whole_word: bool,
    pub case_sensitive: bool,
}

/// Strategy for counting a keyword
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Case-sensitive substring search, no regex needed
    Literal(Arc<str>),
    /// Escaped keyword, optionally case-insensitive and bounded by `\b`
    Regex(Arc<Regex>),
}

impl MatchStrategy {
    /// Counts non-overlapping occurrences, scanning left to right
    pub fn count(&self, text: &str) -> usize {
        match self {
            MatchStrategy::Literal(keyword) => text.matches(keyword.as_ref()).count(),
            MatchStrategy::Regex(regex) => regex.find_iter(text).count(),
        }
    }
}

/// Counts keyword occurrences, memoizing compiled matchers.
///
/// One `PatternMatcher` belongs to one scan run and is shared by every
/// concurrent file scan of that run. Two scans racing to compile the same
/// key both insert equivalent matchers, so the last write simply wins.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    cache: Arc<DashMap<MatcherKey, MatchStrategy>>,
    metrics: ScanMetrics,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a matcher that reports cache lookups to `metrics`
    pub fn with_metrics(metrics: ScanMetrics) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            metrics,
        }
    }

    /// Returns the matcher for a keyword, compiling it on first use
    pub fn compile(
        &self,
        keyword: &str,
        whole_word: bool,
        case_sensitive: bool,
    ) -> ScanResult<MatchStrategy> {
        let key = MatcherKey {
            keyword: keyword.to_string(),
            whole_word,
            case_sensitive,
        };

        if let Some(entry) = self.cache.get(&key) {
            self.metrics.record_cache_lookup(true);
            return Ok(entry.clone());
        }
        self.metrics.record_cache_lookup(false);

        let strategy = Self::build_strategy(&key)?;
        trace!("Compiled matcher for {:?}", key);
        self.cache.insert(key, strategy.clone());
        Ok(strategy)
    }

    fn build_strategy(key: &MatcherKey) -> ScanResult<MatchStrategy> {
        if key.case_sensitive && !key.whole_word {
            return Ok(MatchStrategy::Literal(Arc::from(key.keyword.as_str())));
        }

        let escaped = regex::escape(&key.keyword);
        let pattern = if key.whole_word {
            format!(r"\b{}\b", escaped)
        } else {
            escaped
        };

        RegexBuilder::new(&pattern)
            .case_insensitive(!key.case_sensitive)
            .size_limit(MATCHER_SIZE_LIMIT)
            .build()
            .map(|regex| MatchStrategy::Regex(Arc::new(regex)))
            .map_err(|e| ScanError::invalid_pattern(format!("{}: {}", key.keyword, e)))
    }

    /// Counts literal occurrences of `keyword` in `text`.
    ///
    /// An empty keyword never matches. A keyword too large to compile is an
    /// `InvalidPattern` error, the same as when a scan compiles it.
    pub fn count_matches(
        &self,
        text: &str,
        keyword: &str,
        whole_word: bool,
        case_sensitive: bool,
    ) -> ScanResult<usize> {
        if keyword.is_empty() {
            return Ok(0);
        }
        let strategy = self.compile(keyword, whole_word, case_sensitive)?;
        Ok(strategy.count(text))
    }

    /// Number of compiled matchers currently held
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drops every compiled matcher
    pub fn clear(&self) {
        self.cache.clear();
    }
}
