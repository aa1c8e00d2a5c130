//! Policy filters applied to episode lists before they are compared.
//!
//! Every filter only ever removes episodes and keeps the relative order of
//! what remains.

use chrono::{DateTime, Utc};

use super::models::Episode;

/// Which episodes take part in a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    pub exclude_specials: bool,
    pub exclude_older_than_library_start: bool,
    pub exclude_unaired: bool,
}

pub fn exclude_specials(episodes: &mut Vec<Episode>) {
    episodes.retain(|episode| !episode.is_special());
}

/// Keeps only episodes at or after `reference` in season/episode order.
pub fn exclude_older_than(episodes: &mut Vec<Episode>, reference: &Episode) {
    episodes.retain(|episode| {
        episode.season_number > reference.season_number
            || (episode.season_number == reference.season_number
                && episode.episode_number >= reference.episode_number)
    });
}

/// Drops episodes with an unknown air date or one later than `now`.
pub fn exclude_unaired(episodes: &mut Vec<Episode>, now: DateTime<Utc>) {
    episodes.retain(|episode| matches!(episode.first_aired, Some(aired) if aired <= now));
}

/// The library episode every provider episode is measured against when
/// trimming older episodes.
pub fn library_start(library: &[Episode]) -> Option<&Episode> {
    library.iter().min_by_key(|episode| episode.position())
}

/// Runs the enabled filters in their fixed order: specials on both sides,
/// then older-than-library-start and unaired on the provider side only.
pub fn apply_policy(
    library: &mut Vec<Episode>,
    provider: &mut Vec<Episode>,
    policy: &FilterPolicy,
    now: DateTime<Utc>,
) {
    if policy.exclude_specials {
        exclude_specials(library);
        exclude_specials(provider);
    }
    if policy.exclude_older_than_library_start {
        if let Some(reference) = library_start(library).cloned() {
            tracing::debug!(
                season = reference.season_number,
                episode = reference.episode_number,
                "excluding provider episodes older than library start"
            );
            exclude_older_than(provider, &reference);
        }
    }
    if policy.exclude_unaired {
        exclude_unaired(provider, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ep(season: u32, number: u32) -> Episode {
        Episode::new(0, None, season, number, format!("S{season}E{number}"))
    }

    fn positions(episodes: &[Episode]) -> Vec<(u32, u32)> {
        episodes.iter().map(Episode::position).collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_exclude_specials_is_idempotent() {
        let mut once = vec![ep(0, 1), ep(1, 1), ep(0, 2), ep(2, 1)];
        exclude_specials(&mut once);
        let mut twice = once.clone();
        exclude_specials(&mut twice);

        assert_eq!(positions(&once), vec![(1, 1), (2, 1)]);
        assert_eq!(positions(&once), positions(&twice));
    }

    #[test]
    fn test_empty_input_stays_empty() {
        let mut episodes = Vec::new();
        exclude_specials(&mut episodes);
        exclude_older_than(&mut episodes, &ep(1, 1));
        exclude_unaired(&mut episodes, now());
        assert!(episodes.is_empty());
    }

    #[test]
    fn test_exclude_older_than_boundary() {
        let mut episodes = vec![ep(2, 5), ep(2, 4), ep(1, 99), ep(3, 1)];
        exclude_older_than(&mut episodes, &ep(2, 5));
        assert_eq!(positions(&episodes), vec![(2, 5), (3, 1)]);
    }

    #[test]
    fn test_exclude_unaired() {
        let mut episodes = vec![
            ep(1, 1).with_first_aired(Some(now() - Duration::days(30))),
            ep(1, 2).with_first_aired(Some(now())),
            ep(1, 3).with_first_aired(Some(now() + Duration::days(1))),
            ep(1, 4),
        ];
        exclude_unaired(&mut episodes, now());
        assert_eq!(positions(&episodes), vec![(1, 1), (1, 2)]);
    }

    #[test]
    fn test_specials_and_unaired_commute() {
        let episodes = vec![
            ep(0, 1).with_first_aired(Some(now() - Duration::days(1))),
            ep(0, 2),
            ep(1, 1).with_first_aired(Some(now() - Duration::days(1))),
            ep(1, 2).with_first_aired(Some(now() + Duration::days(1))),
        ];

        let mut specials_first = episodes.clone();
        exclude_specials(&mut specials_first);
        exclude_unaired(&mut specials_first, now());

        let mut unaired_first = episodes;
        exclude_unaired(&mut unaired_first, now());
        exclude_specials(&mut unaired_first);

        assert_eq!(positions(&specials_first), positions(&unaired_first));
        assert_eq!(positions(&specials_first), vec![(1, 1)]);
    }

    #[test]
    fn test_library_start_is_lowest_position() {
        let library = vec![ep(3, 2), ep(2, 7), ep(2, 9)];
        assert_eq!(library_start(&library).map(Episode::position), Some((2, 7)));
        assert!(library_start(&[]).is_none());
    }

    #[test]
    fn test_apply_policy_leaves_library_unaired_episodes_alone() {
        let mut library = vec![ep(0, 1), ep(2, 1), ep(2, 2)];
        let mut provider = vec![
            ep(0, 1).with_first_aired(Some(now() - Duration::days(100))),
            ep(1, 1).with_first_aired(Some(now() - Duration::days(90))),
            ep(2, 1).with_first_aired(Some(now() - Duration::days(10))),
            ep(2, 2).with_first_aired(Some(now() - Duration::days(3))),
            ep(2, 3).with_first_aired(Some(now() + Duration::days(4))),
        ];
        let policy = FilterPolicy {
            exclude_specials: true,
            exclude_older_than_library_start: true,
            exclude_unaired: true,
        };

        apply_policy(&mut library, &mut provider, &policy, now());

        assert_eq!(positions(&library), vec![(2, 1), (2, 2)]);
        assert_eq!(positions(&provider), vec![(2, 1), (2, 2)]);
    }

    #[test]
    fn test_apply_policy_skips_older_filter_for_empty_library() {
        let mut library = Vec::new();
        let mut provider = vec![ep(1, 1), ep(1, 2)];
        let policy = FilterPolicy {
            exclude_older_than_library_start: true,
            ..FilterPolicy::default()
        };

        apply_policy(&mut library, &mut provider, &policy, now());

        assert_eq!(positions(&provider), vec![(1, 1), (1, 2)]);
    }
}
