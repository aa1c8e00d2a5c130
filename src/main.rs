mod cli;
mod config;
mod domain;
mod error;
mod infra;
mod workflows;

use anyhow::Result;
use clap::Parser;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, OutputFormat};
use infra::kodi::KodiClient;
use infra::store::JsonFileStore;
use infra::trakt::TraktClient;
use workflows::reconciler;
use workflows::reporters::console::ConsoleReporter;
use workflows::reporters::structured::StructuredReporter;
use workflows::reporters::Reporter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::load_settings(&cli)?;
    // Settings decide verbosity, so logging starts once they are resolved.
    init_tracing(settings.verbose);

    let store = Arc::new(JsonFileStore::load(config::get_store_path()));
    let kodi = KodiClient::new(settings.kodi.clone());
    let trakt = TraktClient::new(settings.trakt.clone(), store);

    let mut reporter: Box<dyn Reporter> = match settings.output {
        OutputFormat::Text => Box::new(ConsoleReporter::new(io::stdout(), settings.verbose)),
        format => Box::new(StructuredReporter::new(
            io::stdout(),
            format,
            settings.verbose,
        )),
    };

    reconciler::run(&kodi, &trakt, &settings.run, reporter.as_mut()).await
}
