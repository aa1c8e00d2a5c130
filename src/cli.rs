use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Parser)]
#[command(name = "missing-episodes")]
#[command(about = "Compare the TV episodes in a Kodi library against Trakt and list the differences")]
pub struct Cli {
    /// Settings file (defaults to config.toml in the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Report consistent shows and progress too
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Number of shows processed at the same time
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,

    /// Ignore season 0 on both sides
    #[arg(long)]
    pub exclude_specials: bool,

    /// Ignore Trakt episodes older than the first episode in Kodi
    #[arg(long = "exclude-older")]
    pub exclude_older_than_library_start: bool,

    /// Ignore Trakt episodes that have not aired yet
    #[arg(long)]
    pub exclude_unaired: bool,
}
