use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use super::Reporter;
use crate::cli::OutputFormat;
use crate::domain::grouping::SeasonGap;
use crate::domain::models::{imdb_url, Episode, Show};
use crate::domain::reconcile::Reconciliation;
use crate::error::ClientError;

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct Report {
    shows_without_imdb_id: Vec<ShowEntry>,
    shows_not_found_on_trakt: Vec<ShowEntry>,
    shows_with_missing_episodes: Vec<InconsistentShowEntry>,
    shows_without_missing_episodes: Vec<ShowEntry>,
    shows_with_errors: Vec<FailedShowEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowEntry {
    title: String,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    imdb_url: Option<String>,
}

impl From<&Show> for ShowEntry {
    fn from(show: &Show) -> Self {
        Self {
            title: show.title.clone(),
            id: show.id,
            imdb_url: show.external_id.as_deref().map(imdb_url),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeEntry {
    season_number: u32,
    episode_number: u32,
    title: String,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    imdb_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_aired: Option<String>,
}

impl From<&Episode> for EpisodeEntry {
    fn from(episode: &Episode) -> Self {
        Self {
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            title: episode.title.clone(),
            id: episode.id,
            imdb_url: episode.external_id.as_deref().map(imdb_url),
            first_aired: episode.first_aired.map(|aired| aired.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InconsistentShowEntry {
    #[serde(flatten)]
    show: ShowEntry,
    episodes_not_found_on_trakt: Vec<EpisodeEntry>,
    episodes_not_found_in_kodi: Vec<EpisodeEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_seasons: Vec<SeasonGap>,
}

#[derive(Debug, Serialize)]
struct FailedShowEntry {
    #[serde(flatten)]
    show: ShowEntry,
    error: String,
}

/// Collects every outcome and writes a single JSON or YAML document at the end.
pub struct StructuredReporter<W: Write + Send> {
    out: W,
    format: OutputFormat,
    verbose: bool,
    report: Report,
    total_count: usize,
    processed_count: usize,
}

impl<W: Write + Send> StructuredReporter<W> {
    pub fn new(out: W, format: OutputFormat, verbose: bool) -> Self {
        Self {
            out,
            format,
            verbose,
            report: Report::default(),
            total_count: 0,
            processed_count: 0,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn on_show_processed(&mut self) {
        self.processed_count += 1;
        if self.verbose {
            tracing::info!(
                "{}/{} shows processed",
                self.processed_count,
                self.total_count
            );
        }
    }
}

impl<W: Write + Send> Reporter for StructuredReporter<W> {
    fn on_list_shows(&mut self) {
        if self.verbose {
            tracing::info!("listing shows");
        }
    }

    fn on_process_shows(&mut self, shows: &[Show]) {
        self.total_count = shows.len();
    }

    fn on_show_without_external_id(&mut self, show: &Show) {
        self.on_show_processed();
        self.report.shows_without_imdb_id.push(show.into());
    }

    fn on_show_not_found_on_provider(&mut self, show: &Show) {
        self.on_show_processed();
        self.report.shows_not_found_on_trakt.push(show.into());
    }

    fn on_show_consistent(&mut self, show: &Show) {
        self.on_show_processed();
        self.report.shows_without_missing_episodes.push(show.into());
    }

    fn on_show_inconsistent(&mut self, show: &Show, reconciliation: &Reconciliation) {
        self.on_show_processed();
        self.report
            .shows_with_missing_episodes
            .push(InconsistentShowEntry {
                show: show.into(),
                episodes_not_found_on_trakt: reconciliation
                    .missing_from_provider
                    .iter()
                    .map(EpisodeEntry::from)
                    .collect(),
                episodes_not_found_in_kodi: reconciliation
                    .missing_from_library
                    .iter()
                    .map(EpisodeEntry::from)
                    .collect(),
                missing_seasons: reconciliation.missing_seasons.clone(),
            });
    }

    fn on_show_failed(&mut self, show: &Show, error: &ClientError) {
        self.on_show_processed();
        self.report.shows_with_errors.push(FailedShowEntry {
            show: show.into(),
            error: error.to_string(),
        });
    }

    fn on_complete(&mut self) -> Result<()> {
        let document = match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(&self.report)?,
            OutputFormat::Json | OutputFormat::Text => {
                let mut json = serde_json::to_string_pretty(&self.report)?;
                json.push('\n');
                json
            }
        };
        self.out.write_all(document.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
