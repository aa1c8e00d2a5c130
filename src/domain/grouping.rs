use std::collections::BTreeMap;

use serde::Serialize;

use super::models::Episode;

/// season number -> episode number -> episode
pub type SeasonMap = BTreeMap<u32, BTreeMap<u32, Episode>>;

/// Groups episodes by season then number. Duplicate positions resolve to
/// the last one in input order.
pub fn group_by_season(episodes: &[Episode]) -> SeasonMap {
    let mut seasons = SeasonMap::new();
    for episode in episodes {
        seasons
            .entry(episode.season_number)
            .or_default()
            .insert(episode.episode_number, episode.clone());
    }
    seasons
}

/// A provider season none of whose episodes has a counterpart in the library.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeasonGap {
    pub season_number: u32,
    pub episode_count: usize,
}

/// Seasons where every provider episode is also in `missing_from_library`.
/// Both maps come from the same provider list, so equal sizes mean the
/// whole season is missing.
pub fn missing_seasons(provider: &SeasonMap, missing_from_library: &SeasonMap) -> Vec<SeasonGap> {
    missing_from_library
        .iter()
        .filter(|(season, missing)| {
            provider
                .get(season)
                .is_some_and(|episodes| episodes.len() == missing.len())
        })
        .map(|(season, missing)| SeasonGap {
            season_number: *season,
            episode_count: missing.len(),
        })
        .collect()
}
