use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::domain::filters::{apply_policy, FilterPolicy};
use crate::domain::models::Show;
use crate::domain::reconcile::{reconcile, Reconciliation};
use crate::domain::sources::{LibraryClient, ProviderClient};
use crate::error::ClientResult;
use crate::workflows::reporters::Reporter;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub policy: FilterPolicy,
    /// Maximum number of shows with requests in flight at once.
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            policy: FilterPolicy::default(),
            concurrency: 1,
        }
    }
}

#[derive(Debug)]
enum ShowOutcome {
    WithoutExternalId,
    NotFound,
    Reconciled(Reconciliation),
}

/// Reconciles every library show against the provider, reporting one
/// outcome per show. The library connection is closed on the way out,
/// whether or not the run succeeded.
pub async fn run<L, P>(
    library: &L,
    provider: &P,
    options: &RunOptions,
    reporter: &mut dyn Reporter,
) -> Result<()>
where
    L: LibraryClient,
    P: ProviderClient,
{
    library.connect().await?;

    let result = process_shows(library, provider, options, reporter).await;

    if let Err(e) = library.disconnect().await {
        tracing::warn!("failed to disconnect from library: {e}");
    }
    result
}

async fn process_shows<L, P>(
    library: &L,
    provider: &P,
    options: &RunOptions,
    reporter: &mut dyn Reporter,
) -> Result<()>
where
    L: LibraryClient,
    P: ProviderClient,
{
    provider.connect().await?;

    reporter.on_list_shows();
    let mut shows = library.list_shows().await?;
    sort_by_title(&mut shows);
    tracing::info!(count = shows.len(), "processing shows");
    reporter.on_process_shows(&shows);

    let now = Utc::now();
    let policy = options.policy;
    let mut outcomes = stream::iter(shows)
        .map(move |show| async move {
            let outcome = process_show(library, provider, &show, &policy, now).await;
            (show, outcome)
        })
        .buffer_unordered(options.concurrency.max(1));

    while let Some((show, outcome)) = outcomes.next().await {
        match outcome {
            Ok(ShowOutcome::WithoutExternalId) => reporter.on_show_without_external_id(&show),
            Ok(ShowOutcome::NotFound) => reporter.on_show_not_found_on_provider(&show),
            Ok(ShowOutcome::Reconciled(reconciliation)) if reconciliation.is_consistent() => {
                reporter.on_show_consistent(&show)
            }
            Ok(ShowOutcome::Reconciled(reconciliation)) => {
                reporter.on_show_inconsistent(&show, &reconciliation)
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(show = %show.title, "error processing show: {e}");
                reporter.on_show_failed(&show, &e);
            }
        }
    }

    reporter.on_complete()
}

async fn process_show<L, P>(
    library: &L,
    provider: &P,
    show: &Show,
    policy: &FilterPolicy,
    now: DateTime<Utc>,
) -> ClientResult<ShowOutcome>
where
    L: LibraryClient,
    P: ProviderClient,
{
    let Some(external_id) = show.external_id.as_deref() else {
        return Ok(ShowOutcome::WithoutExternalId);
    };

    tracing::debug!(show = %show.title, external_id, "fetching episodes");
    let (mut library_episodes, provider_show) = tokio::try_join!(
        library.list_show_episodes(show.id),
        provider.get_show_by_external_id(external_id),
    )?;
    let Some(provider_show) = provider_show else {
        return Ok(ShowOutcome::NotFound);
    };

    tracing::debug!(
        show = %show.title,
        provider_title = %provider_show.show.title,
        library = library_episodes.len(),
        provider = provider_show.episodes.len(),
        "comparing episodes"
    );
    let mut provider_episodes = provider_show.episodes;
    apply_policy(&mut library_episodes, &mut provider_episodes, policy, now);
    Ok(ShowOutcome::Reconciled(reconcile(
        &library_episodes,
        &provider_episodes,
    )))
}

fn sort_by_title(shows: &mut [Show]) {
    shows.sort_by_cached_key(|show| show.title.to_lowercase());
}
