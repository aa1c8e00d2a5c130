use std::collections::HashMap;

use super::grouping::{group_by_season, missing_seasons, SeasonGap};
use super::models::Episode;

/// The episodes that differ between the library and the provider for one show.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub missing_from_provider: Vec<Episode>,
    pub missing_from_library: Vec<Episode>,
    pub missing_seasons: Vec<SeasonGap>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.missing_from_provider.is_empty() && self.missing_from_library.is_empty()
    }
}

pub fn reconcile(library: &[Episode], provider: &[Episode]) -> Reconciliation {
    let missing_from_library = difference(provider, library);
    let missing_seasons = missing_seasons(
        &group_by_season(provider),
        &group_by_season(&missing_from_library),
    );
    Reconciliation {
        missing_from_provider: difference(library, provider),
        missing_from_library,
        missing_seasons,
    }
}

/// Episodes of `full` without a counterpart in `partial`, in input order.
pub fn difference(full: &[Episode], partial: &[Episode]) -> Vec<Episode> {
    let index = EpisodeIndex::new(partial);
    full.iter()
        .filter(|episode| !index.contains(episode))
        .cloned()
        .collect()
}

/// Candidate lookup by external id and by position. Any episode the
/// matching rule could pair with a probe sits in one of the two buckets, so
/// checking only those candidates gives the same answer as a full scan.
struct EpisodeIndex<'a> {
    by_external_id: HashMap<&'a str, Vec<&'a Episode>>,
    by_position: HashMap<(u32, u32), Vec<&'a Episode>>,
}

impl<'a> EpisodeIndex<'a> {
    fn new(episodes: &'a [Episode]) -> Self {
        let mut by_external_id: HashMap<&str, Vec<&Episode>> = HashMap::new();
        let mut by_position: HashMap<(u32, u32), Vec<&Episode>> = HashMap::new();
        for episode in episodes {
            if let Some(id) = &episode.external_id {
                by_external_id.entry(id.as_str()).or_default().push(episode);
            }
            by_position.entry(episode.position()).or_default().push(episode);
        }
        Self {
            by_external_id,
            by_position,
        }
    }

    fn contains(&self, episode: &Episode) -> bool {
        let by_id = episode
            .external_id
            .as_deref()
            .and_then(|id| self.by_external_id.get(id));
        let by_position = self.by_position.get(&episode.position());
        by_id
            .into_iter()
            .chain(by_position)
            .flatten()
            .any(|candidate| episode.is_same_episode(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(external_id: Option<&str>, season: u32, number: u32) -> Episode {
        Episode::new(
            u64::from(season * 100 + number),
            external_id.map(str::to_string),
            season,
            number,
            format!("S{season}E{number}"),
        )
    }

    fn positions(episodes: &[Episode]) -> Vec<(u32, u32)> {
        episodes.iter().map(Episode::position).collect()
    }

    fn naive_difference(full: &[Episode], partial: &[Episode]) -> Vec<(u32, u32)> {
        full.iter()
            .filter(|one| !partial.iter().any(|other| one.is_same_episode(other)))
            .map(Episode::position)
            .collect()
    }

    #[test]
    fn test_provider_has_extra_episode() {
        let library = vec![ep(None, 1, 1), ep(None, 1, 2)];
        let provider = vec![ep(None, 1, 1), ep(None, 1, 2), ep(None, 1, 3)];

        let result = reconcile(&library, &provider);

        assert!(result.missing_from_provider.is_empty());
        assert_eq!(positions(&result.missing_from_library), vec![(1, 3)]);
        assert!(!result.is_consistent());
    }

    #[test]
    fn test_same_episodes_in_any_order_are_consistent() {
        let library = vec![ep(Some("tt2"), 1, 2), ep(None, 1, 1), ep(None, 1, 1)];
        let provider = vec![ep(None, 1, 1), ep(Some("tt2"), 1, 2)];

        let result = reconcile(&library, &provider);

        assert!(result.is_consistent());
        assert!(result.missing_seasons.is_empty());
    }

    #[test]
    fn test_matching_external_ids_override_numbering() {
        let library = vec![ep(Some("tt1"), 1, 1)];
        let provider = vec![ep(Some("tt1"), 2, 9)];
        assert!(reconcile(&library, &provider).is_consistent());
    }

    #[test]
    fn test_conflicting_external_ids_at_same_position_differ() {
        let library = vec![ep(Some("tt1"), 1, 1)];
        let provider = vec![ep(Some("tt2"), 1, 1)];

        let result = reconcile(&library, &provider);

        assert_eq!(positions(&result.missing_from_provider), vec![(1, 1)]);
        assert_eq!(positions(&result.missing_from_library), vec![(1, 1)]);
    }

    #[test]
    fn test_output_preserves_input_order() {
        let library = vec![ep(None, 1, 1)];
        let provider = vec![ep(None, 3, 1), ep(None, 1, 1), ep(None, 2, 5), ep(None, 2, 1)];
        let result = reconcile(&library, &provider);
        assert_eq!(
            positions(&result.missing_from_library),
            vec![(3, 1), (2, 5), (2, 1)]
        );
    }

    #[test]
    fn test_indexed_difference_matches_naive_scan() {
        let left = vec![
            ep(Some("tt1"), 1, 1),
            ep(Some("tt2"), 1, 2),
            ep(None, 1, 3),
            ep(Some("tt4"), 1, 4),
            ep(None, 2, 1),
            ep(Some("tt9"), 2, 2),
        ];
        let right = vec![
            ep(Some("tt1"), 5, 5),
            ep(None, 1, 2),
            ep(Some("tt3"), 1, 3),
            ep(Some("tt5"), 1, 4),
            ep(None, 3, 3),
        ];

        assert_eq!(positions(&difference(&left, &right)), naive_difference(&left, &right));
        assert_eq!(positions(&difference(&right, &left)), naive_difference(&right, &left));
    }

    #[test]
    fn test_reports_missing_seasons() {
        let library = vec![ep(None, 1, 1)];
        let provider = vec![ep(None, 1, 1), ep(None, 2, 1), ep(None, 2, 2)];

        let result = reconcile(&library, &provider);

        assert_eq!(
            result.missing_seasons,
            vec![SeasonGap {
                season_number: 2,
                episode_count: 2
            }]
        );
    }

    #[test]
    fn test_renumbered_season_matched_by_external_id_is_not_a_gap() {
        let library = vec![
            ep(Some("ttA"), 2, 11),
            ep(Some("ttB"), 2, 12),
            ep(None, 1, 1),
        ];
        let provider = vec![ep(Some("ttA"), 3, 1), ep(Some("ttB"), 3, 2), ep(None, 1, 2)];

        let result = reconcile(&library, &provider);

        assert_eq!(positions(&result.missing_from_library), vec![(1, 2)]);
        assert!(result.missing_seasons.is_empty());
    }

    #[test]
    fn test_partially_matched_season_is_not_a_gap() {
        let library = vec![ep(None, 1, 1), ep(Some("ttA"), 9, 9)];
        let provider = vec![ep(None, 1, 1), ep(Some("ttA"), 2, 1), ep(Some("ttB"), 2, 2)];

        let result = reconcile(&library, &provider);

        assert_eq!(positions(&result.missing_from_library), vec![(2, 2)]);
        assert!(result.missing_seasons.is_empty());
    }
}
