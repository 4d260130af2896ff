//! Catalog resource kinds.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The two entity kinds exposed by the upstream catalog.
///
/// Serialized as the upstream collection name (`people` / `films`), which is
/// also the search type accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ResourceKind {
    #[serde(rename = "people")]
    Person,
    #[serde(rename = "films")]
    Film,
}

impl ResourceKind {
    /// Upstream collection path segment.
    pub fn segment(self) -> &'static str {
        match self {
            Self::Person => "people",
            Self::Film => "films",
        }
    }

    /// Cache-key prefix for the full entity (`person:42`).
    pub fn cache_prefix(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Film => "film",
        }
    }

    /// Cache-key prefix for the embedded summary (`film-summary:3`).
    pub fn summary_prefix(self) -> &'static str {
        match self {
            Self::Person => "person-summary",
            Self::Film => "film-summary",
        }
    }

    /// Property holding the display name of an entity of this kind.
    pub fn display_field(self) -> &'static str {
        match self {
            Self::Person => "name",
            Self::Film => "title",
        }
    }

    /// Property on this kind that lists references to the other kind.
    pub fn reference_field(self) -> &'static str {
        match self {
            Self::Person => "films",
            Self::Film => "characters",
        }
    }

    /// Kind of the entities listed in [`Self::reference_field`].
    pub fn referenced_kind(self) -> Self {
        match self {
            Self::Person => Self::Film,
            Self::Film => Self::Person,
        }
    }

    /// Query parameter used for free-text search.
    pub fn search_param(self) -> &'static str {
        self.display_field()
    }

    /// Operation name reported when a search exhausts its retries.
    pub fn search_operation(self) -> &'static str {
        match self {
            Self::Person => "searchPeople",
            Self::Film => "searchFilms",
        }
    }

    /// Operation name reported when a detail fetch exhausts its retries.
    pub fn get_operation(self) -> &'static str {
        match self {
            Self::Person => "getPerson",
            Self::Film => "getFilm",
        }
    }

    pub fn cache_key(self, id: u64) -> String {
        format!("{}:{}", self.cache_prefix(), id)
    }

    pub fn summary_key(self, id: u64) -> String {
        format!("{}:{}", self.summary_prefix(), id)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "people" => Ok(Self::Person),
            "films" => Ok(Self::Film),
            other => Err(Error::InvalidInput(format!(
                "the search type must be either \"people\" or \"films\", got \"{other}\""
            ))),
        }
    }
}
