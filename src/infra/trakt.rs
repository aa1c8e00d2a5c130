use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::models::{normalize_external_id, Episode, Show, ShowWithEpisodes};
use crate::domain::sources::ProviderClient;
use crate::error::{ClientError, ClientResult};
use crate::infra::store::KeyValueStore;

const TRAKT_API_BASE: &str = "https://api.trakt.tv";
const TOKEN_KEY: &str = "trakt.token";
const SHOW_CACHE_PREFIX: &str = "trakt.showCache.";
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, Clone)]
pub struct TraktOptions {
    pub client_id: String,
    pub client_secret: String,
    /// Cached show lookups younger than this are reused. `None` disables the cache.
    pub max_cache_age: Option<Duration>,
}

pub struct TraktClient {
    client: reqwest::Client,
    base_url: String,
    options: TraktOptions,
    store: Arc<dyn KeyValueStore>,
    token: RwLock<Option<TraktToken>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct TraktToken {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    created_at: i64,
}

impl TraktToken {
    fn is_expired(&self, now: i64) -> bool {
        self.created_at + self.expires_in <= now
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCode {
    device_code: String,
    user_code: String,
    verification_url: String,
    expires_in: u64,
    interval: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "type")]
    kind: String,
    show: Option<SearchShow>,
}

#[derive(Debug, Deserialize)]
struct SearchShow {
    title: Option<String>,
    ids: ShowIds,
}

#[derive(Debug, Deserialize)]
struct ShowIds {
    trakt: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ShowInfo {
    id: u64,
    title: String,
    seasons: Vec<SeasonInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct SeasonInfo {
    #[serde(default)]
    episodes: Vec<EpisodeInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct EpisodeInfo {
    season: u32,
    number: u32,
    title: Option<String>,
    ids: EpisodeIds,
    first_aired: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct EpisodeIds {
    trakt: u64,
    imdb: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedLookup {
    timestamp: i64,
    data: Option<ShowInfo>,
}

impl TraktClient {
    pub fn new(options: TraktOptions, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_base_url(options, store, TRAKT_API_BASE.to_string())
    }

    pub fn with_base_url(
        options: TraktOptions,
        store: Arc<dyn KeyValueStore>,
        base_url: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            options,
            store,
            token: RwLock::new(None),
        }
    }

    async fn request(&self, builder: reqwest::RequestBuilder) -> ClientResult<reqwest::Response> {
        let mut builder = builder
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.options.client_id);
        if let Some(token) = self.token.read().await.as_ref() {
            builder = builder.bearer_auth(&token.access_token);
        }
        builder.send().await.map_err(ClientError::from_transport)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<T> {
        tracing::debug!(path, "trakt request");
        let response = self
            .request(self.client.get(format!("{}{}", self.base_url, path)).query(query))
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ClientError::RateLimited("Trakt".to_string()));
        }
        if status.as_u16() == 401 {
            return Err(ClientError::Auth("Trakt rejected the access token".to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&response.text().await?)?)
    }

    async fn post_token(&self, path: &str, body: serde_json::Value) -> ClientResult<reqwest::Response> {
        self.request(self.client.post(format!("{}{}", self.base_url, path)).json(&body))
            .await
    }

    async fn refresh_token(&self, token: &TraktToken) -> ClientResult<TraktToken> {
        let response = self
            .post_token(
                "/oauth/token",
                json!({
                    "refresh_token": token.refresh_token,
                    "client_id": self.options.client_id,
                    "client_secret": self.options.client_secret,
                    "redirect_uri": OOB_REDIRECT_URI,
                    "grant_type": "refresh_token",
                }),
            )
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Auth(format!(
                "token refresh failed: HTTP {}",
                response.status()
            )));
        }
        Ok(serde_json::from_str(&response.text().await?)?)
    }

    async fn authorize_device(&self) -> ClientResult<TraktToken> {
        let response = self
            .post_token(
                "/oauth/device/code",
                json!({ "client_id": self.options.client_id }),
            )
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Auth(format!(
                "device code request failed: HTTP {}",
                response.status()
            )));
        }
        let code: DeviceCode = serde_json::from_str(&response.text().await?)?;

        eprintln!(
            "Open {} and enter the code {} to authorize access to Trakt.",
            code.verification_url, code.user_code
        );

        let mut interval = Duration::from_secs(code.interval);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(code.expires_in);
        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() > deadline {
                return Err(ClientError::Auth("device code expired".to_string()));
            }

            let response = self
                .post_token(
                    "/oauth/device/token",
                    json!({
                        "code": code.device_code,
                        "client_id": self.options.client_id,
                        "client_secret": self.options.client_secret,
                    }),
                )
                .await?;

            match response.status().as_u16() {
                200 => return Ok(serde_json::from_str(&response.text().await?)?),
                400 => tracing::debug!("waiting for the user to approve the device"),
                429 => interval += Duration::from_secs(1),
                404 => return Err(ClientError::Auth("invalid device code".to_string())),
                409 => return Err(ClientError::Auth("device code already used".to_string())),
                410 => return Err(ClientError::Auth("device code expired".to_string())),
                418 => return Err(ClientError::Auth("authorization denied".to_string())),
                status => {
                    return Err(ClientError::Auth(format!(
                        "device authorization failed: HTTP {status}"
                    )))
                }
            }
        }
    }

    async fn cached_lookup(&self, imdb_id: &str) -> ClientResult<Option<ShowInfo>> {
        let Some(max_age) = self.options.max_cache_age.filter(|age| !age.is_zero()) else {
            return self.uncached_lookup(imdb_id).await;
        };

        let key = format!("{SHOW_CACHE_PREFIX}{imdb_id}");
        let now = Utc::now().timestamp_millis();
        if let Some(entry) = self
            .store
            .get(&key)
            .and_then(|value| serde_json::from_value::<CachedLookup>(value).ok())
        {
            let age = now - entry.timestamp;
            if age >= 0 && (age as u128) < max_age.as_millis() {
                tracing::debug!(imdb_id, "using cached Trakt lookup");
                return Ok(entry.data);
            }
        }

        let data = self.uncached_lookup(imdb_id).await?;
        let entry = CachedLookup {
            timestamp: now,
            data: data.clone(),
        };
        if let Err(e) = self.store.set(&key, serde_json::to_value(&entry)?).await {
            tracing::warn!(imdb_id, "failed to cache Trakt lookup: {e}");
        }
        Ok(data)
    }

    async fn uncached_lookup(&self, imdb_id: &str) -> ClientResult<Option<ShowInfo>> {
        let results: Vec<SearchResult> = self
            .get(&format!("/search/imdb/{imdb_id}"), &[("type", "show")])
            .await?;
        let Some(show) = results
            .into_iter()
            .next()
            .filter(|result| result.kind == "show")
            .and_then(|result| result.show)
        else {
            return Ok(None);
        };

        let seasons: Vec<SeasonInfo> = self
            .get(
                &format!("/shows/{}/seasons", show.ids.trakt),
                &[("extended", "full,episodes")],
            )
            .await?;
        Ok(Some(ShowInfo {
            id: show.ids.trakt,
            title: show.title.unwrap_or_default(),
            seasons,
        }))
    }
}

#[async_trait]
impl ProviderClient for TraktClient {
    async fn connect(&self) -> ClientResult<()> {
        let now = Utc::now().timestamp();
        let stored = self
            .store
            .get(TOKEN_KEY)
            .and_then(|value| serde_json::from_value::<TraktToken>(value).ok());

        let token = match stored {
            Some(token) if !token.is_expired(now) => token,
            Some(token) => match self.refresh_token(&token).await {
                Ok(token) => token,
                Err(e @ ClientError::Connection(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("token refresh failed, reauthorizing: {e}");
                    self.authorize_device().await?
                }
            },
            None => self.authorize_device().await?,
        };

        if let Err(e) = self.store.set(TOKEN_KEY, serde_json::to_value(&token)?).await {
            tracing::warn!("failed to persist Trakt token: {e}");
        }
        *self.token.write().await = Some(token);
        tracing::info!("connected to Trakt");
        Ok(())
    }

    async fn get_show_by_external_id(
        &self,
        external_id: &str,
    ) -> ClientResult<Option<ShowWithEpisodes>> {
        let Some(info) = self.cached_lookup(external_id).await? else {
            return Ok(None);
        };

        let episodes = info
            .seasons
            .into_iter()
            .flat_map(|season| season.episodes)
            .map(|episode| {
                Episode::new(
                    episode.ids.trakt,
                    normalize_external_id(episode.ids.imdb),
                    episode.season,
                    episode.number,
                    episode.title.unwrap_or_default(),
                )
                .with_first_aired(episode.first_aired)
            })
            .collect();

        Ok(Some(ShowWithEpisodes {
            show: Show::new(info.id, Some(external_id.to_string()), info.title),
            episodes,
        }))
    }
}
