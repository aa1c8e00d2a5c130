use async_trait::async_trait;

use super::models::{Episode, Show, ShowWithEpisodes};
use crate::error::ClientResult;

/// The local media center holding the user's collection.
#[async_trait]
pub trait LibraryClient: Send + Sync {
    async fn connect(&self) -> ClientResult<()>;

    async fn disconnect(&self) -> ClientResult<()>;

    async fn list_shows(&self) -> ClientResult<Vec<Show>>;

    async fn list_show_episodes(&self, show_id: u64) -> ClientResult<Vec<Episode>>;
}

/// The remote metadata service treated as the source of truth.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn connect(&self) -> ClientResult<()>;

    /// `Ok(None)` when the provider does not know the show.
    async fn get_show_by_external_id(
        &self,
        external_id: &str,
    ) -> ClientResult<Option<ShowWithEpisodes>>;
}
