use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single episode as reported by either the library or the provider.
///
/// Deliberately not `PartialEq`: the matching rule in [`Episode::is_same_episode`]
/// is not transitive, so it cannot back a lawful `Eq`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Episode {
    pub id: u64,
    pub external_id: Option<String>,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: String,
    /// Only ever set on provider episodes.
    pub first_aired: Option<DateTime<Utc>>,
}

impl Episode {
    pub fn new(
        id: u64,
        external_id: Option<String>,
        season_number: u32,
        episode_number: u32,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            external_id,
            season_number,
            episode_number,
            title: title.into(),
            first_aired: None,
        }
    }

    pub fn with_first_aired(mut self, first_aired: Option<DateTime<Utc>>) -> Self {
        self.first_aired = first_aired;
        self
    }

    pub fn position(&self) -> (u32, u32) {
        (self.season_number, self.episode_number)
    }

    pub fn is_special(&self) -> bool {
        self.season_number == 0
    }

    /// External ids win when both sides have one; otherwise fall back to
    /// the season/episode position.
    pub fn is_same_episode(&self, other: &Episode) -> bool {
        match (&self.external_id, &other.external_id) {
            (Some(one), Some(two)) => one == two,
            _ => self.position() == other.position(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Show {
    pub id: u64,
    pub external_id: Option<String>,
    pub title: String,
}

impl Show {
    pub fn new(id: u64, external_id: Option<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            external_id,
            title: title.into(),
        }
    }
}

/// A provider show together with its full, flattened episode list.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ShowWithEpisodes {
    pub show: Show,
    pub episodes: Vec<Episode>,
}

/// Trims an external id and treats a blank one as absent, so both sources
/// feed the matching rule the same shape of id.
pub fn normalize_external_id(external_id: Option<String>) -> Option<String> {
    external_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

pub fn imdb_url(imdb_id: &str) -> String {
    format!("https://www.imdb.com/title/{imdb_id}/")
}
