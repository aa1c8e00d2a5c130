use anyhow::Result;
use std::collections::HashSet;
use std::io::Write;

use super::Reporter;
use crate::domain::models::{imdb_url, Episode, Show};
use crate::domain::reconcile::Reconciliation;
use crate::error::ClientError;

const INDENT1: &str = "  ";
const INDENT2: &str = "    ";
const SEPARATOR: &str = " · ";

/// Human-readable report, one block per show that needs attention.
pub struct ConsoleReporter<W: Write + Send> {
    out: W,
    verbose: bool,
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_block(&mut self, title: &str, lines: &[String]) {
        let mut block = format!("{title}\n");
        for line in lines {
            block.push_str(line);
            block.push('\n');
        }
        block.push('\n');
        if let Err(e) = self.out.write_all(block.as_bytes()) {
            tracing::warn!("failed to write report: {e}");
        }
    }
}

/// `1x03. Title · ID: 12 · IMDb: ... · Aired: 2008-01-21` for provider
/// episodes, `Title · ID: 70` for library ones.
pub fn format_episode(episode: &Episode, from_provider: bool) -> String {
    let mut info = vec![format!("ID: {}", episode.id)];
    if let Some(imdb_id) = &episode.external_id {
        info.push(format!("IMDb: {}", imdb_url(imdb_id)));
    }
    let mut prefix = String::new();
    if from_provider {
        prefix = format!("{}x{:02}. ", episode.season_number, episode.episode_number);
        if let Some(aired) = episode.first_aired {
            info.push(format!("Aired: {}", aired.format("%Y-%m-%d")));
        }
    }
    format!("{prefix}{}{SEPARATOR}{}", episode.title, info.join(SEPARATOR))
}

fn season_label(season_number: u32) -> String {
    if season_number == 0 {
        "Specials".to_string()
    } else {
        format!("Season {season_number}")
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn on_show_without_external_id(&mut self, show: &Show) {
        self.write_block(&show.title, &[format!("{INDENT1}Show IMDb ID unknown")]);
    }

    fn on_show_not_found_on_provider(&mut self, show: &Show) {
        self.write_block(&show.title, &[format!("{INDENT1}Show not found on Trakt")]);
    }

    fn on_show_consistent(&mut self, show: &Show) {
        if !self.verbose {
            return;
        }
        self.write_block(&show.title, &[format!("{INDENT1}Looking good")]);
    }

    fn on_show_inconsistent(&mut self, show: &Show, reconciliation: &Reconciliation) {
        let mut lines = Vec::new();

        // Whole missing seasons are summarised instead of listed episode by episode.
        let gap_seasons: HashSet<u32> = reconciliation
            .missing_seasons
            .iter()
            .map(|gap| gap.season_number)
            .collect();
        if !reconciliation.missing_seasons.is_empty() {
            lines.push(format!("{INDENT1}Missing seasons"));
            for gap in &reconciliation.missing_seasons {
                lines.push(format!(
                    "{INDENT2}{} (episodes: {})",
                    season_label(gap.season_number),
                    gap.episode_count
                ));
            }
        }

        if !reconciliation.missing_from_provider.is_empty() {
            lines.push(format!("{INDENT1}Not found on Trakt"));
            for episode in &reconciliation.missing_from_provider {
                lines.push(format!("{INDENT2}{}", format_episode(episode, false)));
            }
        }

        let missing_episodes: Vec<&Episode> = reconciliation
            .missing_from_library
            .iter()
            .filter(|episode| !gap_seasons.contains(&episode.season_number))
            .collect();
        if !missing_episodes.is_empty() {
            lines.push(format!("{INDENT1}Missing from Kodi"));
            for episode in missing_episodes {
                lines.push(format!("{INDENT2}{}", format_episode(episode, true)));
            }
        }

        self.write_block(&show.title, &lines);
    }

    fn on_show_failed(&mut self, show: &Show, error: &ClientError) {
        self.write_block(&show.title, &[format!("{INDENT1}Error: {error}")]);
    }

    fn on_complete(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
