//! Music search for the audio post composer
//!
//! Uses the OAuth client-credentials flow. The access token is cached and
//! refreshed once it is within [`TOKEN_REFRESH_MARGIN_SECS`] of expiry.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::MusicConfig;
use crate::error::{AppError, Result};
use crate::models::Track;

pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const MAX_SEARCH_LIMIT: i64 = 50;
const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    album: ApiAlbum,
    preview_url: Option<String>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    name: String,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl From<ApiTrack> for Track {
    fn from(t: ApiTrack) -> Self {
        Track {
            id: t.id,
            name: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            album: t.album.name,
            // Largest image comes first
            album_art: t.album.images.into_iter().next().map(|i| i.url),
            preview_url: t.preview_url,
            external_url: t.external_urls.spotify,
        }
    }
}

#[derive(Clone)]
pub struct MusicClient {
    http: reqwest::Client,
    config: MusicConfig,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl MusicClient {
    pub fn new(config: MusicConfig) -> Self {
        Self::with_timeout(config, HTTP_TIMEOUT)
    }

    /// Every upstream call, token refresh included, gives up after `timeout`
    pub fn with_timeout(config: MusicConfig, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            config,
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled()
    }

    async fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.access_token.clone());
            }
        }

        let (Some(client_id), Some(client_secret)) =
            (&self.config.client_id, &self.config.client_secret)
        else {
            return Err(AppError::ExternalService("Music search is not configured".into()));
        };

        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Music token request failed with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Refreshed music access token");

        let access_token = token.access_token.clone();
        *slot = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });
        Ok(access_token)
    }

    pub async fn search_tracks(&self, query: &str, limit: Option<i64>) -> Result<Vec<Track>> {
        if !self.enabled() {
            return Err(AppError::ExternalService("Music search is not configured".into()));
        }
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let limit = limit.unwrap_or(20).clamp(1, MAX_SEARCH_LIMIT).to_string();
        let token = self.access_token().await?;
        let url = format!("{}/search", self.config.api_base_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked early; the next call fetches a new one
            *self.token.write().await = None;
        }
        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Music search failed with status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.tracks.items.into_iter().map(Track::from).collect())
    }
}
