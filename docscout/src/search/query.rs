use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::DocumentKind;
use crate::errors::{ScanError, ScanResult};

/// How the two keywords of a query are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordLogic {
    /// Both keywords must be found
    #[default]
    And,
    /// Either keyword is enough
    Or,
}

impl FromStr for KeywordLogic {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(KeywordLogic::And),
            "or" => Ok(KeywordLogic::Or),
            other => Err(ScanError::config_error(format!(
                "Unknown keyword logic '{}', expected 'and' or 'or'",
                other
            ))),
        }
    }
}

impl fmt::Display for KeywordLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordLogic::And => f.write_str("AND"),
            KeywordLogic::Or => f.write_str("OR"),
        }
    }
}

/// Decides whether a document matches, given which keywords were found.
///
/// Without an active second keyword the result is simply `found1`.
pub fn decide(found1: bool, found2: bool, keyword2_active: bool, logic: KeywordLogic) -> bool {
    if !keyword2_active {
        return found1;
    }
    match logic {
        KeywordLogic::And => found1 && found2,
        KeywordLogic::Or => found1 || found2,
    }
}

/// Restricts a run to one family of documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Tabular,
    #[serde(alias = "pdf")]
    PageText,
}

impl TypeFilter {
    pub fn accepts(&self, kind: DocumentKind) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Tabular => kind == DocumentKind::Tabular,
            TypeFilter::PageText => kind == DocumentKind::PageText,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "both" => Ok(TypeFilter::All),
            "tabular" | "excel" => Ok(TypeFilter::Tabular),
            "pagetext" | "pdf" => Ok(TypeFilter::PageText),
            other => Err(ScanError::config_error(format!(
                "Unknown document type '{}', expected 'all', 'tabular' or 'pdf'",
                other
            ))),
        }
    }
}

/// One keyword search across a set of documents.
///
/// Build it with [`SearchQuery::new`], which trims both keywords and rejects
/// an empty first keyword; an empty second keyword means "not used".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    keyword1: String,
    keyword2: Option<String>,
    pub logic: KeywordLogic,
    pub whole_word: bool,
    pub case_sensitive: bool,
    pub type_filter: TypeFilter,
}

impl SearchQuery {
    pub fn new(keyword1: &str, keyword2: Option<&str>) -> ScanResult<Self> {
        let keyword1 = keyword1.trim();
        if keyword1.is_empty() {
            return Err(ScanError::config_error("Keyword 1 must not be empty"));
        }
        let keyword2 = keyword2
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(Self {
            keyword1: keyword1.to_string(),
            keyword2,
            logic: KeywordLogic::default(),
            whole_word: false,
            case_sensitive: false,
            type_filter: TypeFilter::default(),
        })
    }

    pub fn with_logic(mut self, logic: KeywordLogic) -> Self {
        self.logic = logic;
        self
    }

    pub fn with_whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_type_filter(mut self, type_filter: TypeFilter) -> Self {
        self.type_filter = type_filter;
        self
    }

    pub fn keyword1(&self) -> &str {
        &self.keyword1
    }

    pub fn keyword2(&self) -> Option<&str> {
        self.keyword2.as_deref()
    }

    pub fn keyword2_active(&self) -> bool {
        self.keyword2.is_some()
    }

    /// Applies this query's logic to a pair of found flags
    pub fn is_match(&self, found1: bool, found2: bool) -> bool {
        decide(found1, found2, self.keyword2_active(), self.logic)
    }

    /// True once both keywords of a two-keyword query have been seen, at
    /// which point scanning more of the document cannot change the outcome.
    ///
    /// A single-keyword query never settles early, so its occurrence count
    /// always covers the whole document.
    pub fn is_settled(&self, found1: bool, found2: bool) -> bool {
        self.keyword2_active() && found1 && found2
    }
}
