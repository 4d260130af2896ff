//! Search request validation.

use std::sync::LazyLock;

use holonet_core::{Error, ResourceKind};
use regex::Regex;

/// Longest accepted search term, in characters.
pub const MAX_TERM_CHARS: usize = 100;

static TERM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9 \t\r\n\x0B\x0C\-]+$").expect("static pattern is valid"));

/// A validated free-text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub kind: ResourceKind,
}

impl SearchQuery {
    /// Validate a raw term and type as received from a caller.
    ///
    /// The term is trimmed, must be 1 to 100 characters and may contain only
    /// ASCII letters, digits, ASCII whitespace and hyphens.
    pub fn parse(term: &str, kind: &str) -> Result<Self, Error> {
        let kind: ResourceKind = kind.trim().parse()?;
        Self::new(term, kind)
    }

    pub fn new(term: &str, kind: ResourceKind) -> Result<Self, Error> {
        let query = Self { term: term.trim().to_string(), kind };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.term.is_empty() {
            return Err(Error::InvalidInput("the search query is required".into()));
        }

        if self.term.chars().count() > MAX_TERM_CHARS {
            return Err(Error::InvalidInput(format!(
                "the search query must not exceed {MAX_TERM_CHARS} characters"
            )));
        }

        if !TERM_PATTERN.is_match(&self.term) {
            return Err(Error::InvalidInput(
                "the search query can only contain letters, numbers, spaces, and hyphens".into(),
            ));
        }

        Ok(())
    }
}
