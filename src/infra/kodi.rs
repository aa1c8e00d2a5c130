use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::models::{normalize_external_id, Episode, Show};
use crate::domain::sources::LibraryClient;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Deserialize)]
pub struct KodiOptions {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for KodiOptions {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            username: None,
            password: None,
        }
    }
}

/// Talks to Kodi over its HTTP JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct KodiClient {
    client: reqwest::Client,
    endpoint: String,
    options: KodiOptions,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize, Default)]
struct UniqueId {
    imdb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TvShowsResult {
    #[serde(default)]
    tvshows: Vec<TvShowInfo>,
}

#[derive(Debug, Deserialize)]
struct TvShowInfo {
    tvshowid: u64,
    title: String,
    #[serde(default)]
    uniqueid: UniqueId,
}

#[derive(Debug, Deserialize)]
struct EpisodesResult {
    #[serde(default)]
    episodes: Vec<EpisodeInfo>,
}

#[derive(Debug, Deserialize)]
struct EpisodeInfo {
    episodeid: u64,
    title: String,
    season: u32,
    episode: u32,
    #[serde(default)]
    uniqueid: UniqueId,
}

impl KodiClient {
    pub fn new(options: KodiOptions) -> Self {
        let endpoint = format!("http://{}:{}/jsonrpc", options.hostname, options.port);
        Self::with_endpoint(options, endpoint)
    }

    pub fn with_endpoint(options: KodiOptions, endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            options,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ClientResult<T> {
        tracing::debug!(method, "kodi request");
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(username) = &self.options.username {
            request = request.basic_auth(username, self.options.password.as_ref());
        }
        let response = request.send().await.map_err(ClientError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let rpc: RpcResponse<T> = serde_json::from_str(&response.text().await?)?;
        if let Some(error) = rpc.error {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: format!("{method} failed ({}): {}", error.code, error.message),
            });
        }
        rpc.result.ok_or_else(|| ClientError::Api {
            status: status.as_u16(),
            message: format!("{method} returned no result"),
        })
    }
}

fn imdb_id(unique_id: UniqueId) -> Option<String> {
    normalize_external_id(unique_id.imdb)
}

#[async_trait]
impl LibraryClient for KodiClient {
    async fn connect(&self) -> ClientResult<()> {
        let pong = match self.call::<String>("JSONRPC.Ping", json!({})).await {
            Ok(pong) => pong,
            Err(ClientError::Connection(message)) => return Err(ClientError::Connection(message)),
            Err(e) => return Err(ClientError::Connection(format!("Kodi ping failed: {e}"))),
        };
        if pong != "pong" {
            return Err(ClientError::Connection(format!(
                "unexpected Kodi ping reply: {pong}"
            )));
        }
        tracing::info!(endpoint = %self.endpoint, "connected to Kodi");
        Ok(())
    }

    async fn disconnect(&self) -> ClientResult<()> {
        tracing::debug!(endpoint = %self.endpoint, "disconnected from Kodi");
        Ok(())
    }

    async fn list_shows(&self) -> ClientResult<Vec<Show>> {
        let result: TvShowsResult = self
            .call(
                "VideoLibrary.GetTVShows",
                json!({ "properties": ["uniqueid", "title"] }),
            )
            .await?;
        Ok(result
            .tvshows
            .into_iter()
            .map(|show| Show::new(show.tvshowid, imdb_id(show.uniqueid), show.title))
            .collect())
    }

    async fn list_show_episodes(&self, show_id: u64) -> ClientResult<Vec<Episode>> {
        let result: EpisodesResult = self
            .call(
                "VideoLibrary.GetEpisodes",
                json!({
                    "tvshowid": show_id,
                    "properties": ["uniqueid", "season", "episode", "title"],
                }),
            )
            .await?;
        tracing::debug!(show_id, count = result.episodes.len(), "kodi episodes");
        Ok(result
            .episodes
            .into_iter()
            .map(|episode| {
                Episode::new(
                    episode.episodeid,
                    imdb_id(episode.uniqueid),
                    episode.season,
                    episode.episode,
                    episode.title,
                )
            })
            .collect())
    }
}
