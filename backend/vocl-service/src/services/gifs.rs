/// GIF search for the composer
///
/// Falls back to a deterministic placeholder list when the API key is missing
/// or the upstream call fails.
use serde::Deserialize;
use std::time::Duration;

use crate::config::GifConfig;
use crate::error::{AppError, Result};
use crate::models::Gif;

const MAX_GIF_LIMIT: i64 = 50;
const DEFAULT_GIF_LIMIT: i64 = 24;

#[derive(Debug, Deserialize)]
struct GifResponse {
    #[serde(default)]
    data: Vec<ApiGif>,
}

#[derive(Debug, Deserialize)]
struct ApiGif {
    id: String,
    #[serde(default)]
    title: String,
    images: ApiImages,
}

#[derive(Debug, Deserialize)]
struct ApiImages {
    original: ApiRendition,
    fixed_width_small: Option<ApiRendition>,
}

/// Dimensions come back as strings
#[derive(Debug, Deserialize)]
struct ApiRendition {
    url: String,
    #[serde(default)]
    width: String,
    #[serde(default)]
    height: String,
}

impl From<ApiGif> for Gif {
    fn from(g: ApiGif) -> Self {
        let preview_url = g
            .images
            .fixed_width_small
            .map(|r| r.url)
            .unwrap_or_else(|| g.images.original.url.clone());
        Gif {
            id: g.id,
            title: g.title,
            width: g.images.original.width.parse().unwrap_or(0),
            height: g.images.original.height.parse().unwrap_or(0),
            url: g.images.original.url,
            preview_url,
        }
    }
}

fn clamp_gif_limit(limit: Option<i64>) -> usize {
    limit.unwrap_or(DEFAULT_GIF_LIMIT).clamp(1, MAX_GIF_LIMIT) as usize
}

/// Placeholder results keyed on the query, stable across calls
pub fn mock_gifs(query: &str, limit: Option<i64>) -> Vec<Gif> {
    let label = match query.trim() {
        "" => "trending".to_string(),
        q => q.to_lowercase(),
    };
    let slug: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let text: String = url::form_urlencoded::byte_serialize(label.as_bytes()).collect();

    (1..=clamp_gif_limit(limit))
        .map(|i| Gif {
            id: format!("mock-{}-{}", slug, i),
            title: format!("{} {}", label, i),
            url: format!("https://placehold.co/480x270.gif?text={}+{}", text, i),
            preview_url: format!("https://placehold.co/200x113.gif?text={}+{}", text, i),
            width: 480,
            height: 270,
        })
        .collect()
}

#[derive(Clone)]
pub struct GifClient {
    http: reqwest::Client,
    config: GifConfig,
}

impl GifClient {
    pub fn new(config: GifConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    pub async fn search(&self, query: &str, limit: Option<i64>) -> Vec<Gif> {
        let query = query.trim();
        if query.is_empty() {
            return self.trending(limit).await;
        }
        self.fetch_or_mock("search", Some(query), limit).await
    }

    pub async fn trending(&self, limit: Option<i64>) -> Vec<Gif> {
        self.fetch_or_mock("trending", None, limit).await
    }

    async fn fetch_or_mock(&self, endpoint: &str, query: Option<&str>, limit: Option<i64>) -> Vec<Gif> {
        let Some(api_key) = &self.config.api_key else {
            return mock_gifs(query.unwrap_or_default(), limit);
        };

        match self.fetch(api_key, endpoint, query, limit).await {
            Ok(gifs) => gifs,
            Err(e) => {
                tracing::warn!(error = %e, endpoint = endpoint, "GIF API failed, serving placeholders");
                mock_gifs(query.unwrap_or_default(), limit)
            }
        }
    }

    async fn fetch(
        &self,
        api_key: &str,
        endpoint: &str,
        query: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Gif>> {
        let url = format!(
            "{}/gifs/{}",
            self.config.api_base_url.trim_end_matches('/'),
            endpoint
        );
        let limit = clamp_gif_limit(limit).to_string();

        let mut params = vec![
            ("api_key", api_key),
            ("limit", limit.as_str()),
            ("rating", self.config.rating.as_str()),
        ];
        if let Some(q) = query {
            params.push(("q", q));
        }

        let response = self.http.get(&url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "GIF API returned {}",
                response.status()
            )));
        }

        let body: GifResponse = response.json().await?;
        Ok(body.data.into_iter().map(Gif::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> GifConfig {
        GifConfig {
            api_key: api_key.map(str::to_string),
            // Nothing listens here, so real fetches fail fast
            api_base_url: "http://127.0.0.1:9/v1".into(),
            rating: "pg-13".into(),
        }
    }

    #[test]
    fn test_mock_gifs_deterministic() {
        let a = mock_gifs("Happy Cat", Some(3));
        let b = mock_gifs("happy cat", Some(3));
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].id, "mock-happy-cat-1");
        assert!(a[2].url.contains("happy+cat+3"));
    }

    #[test]
    fn test_mock_gifs_limits() {
        assert_eq!(mock_gifs("", None).len(), DEFAULT_GIF_LIMIT as usize);
        assert_eq!(mock_gifs("x", Some(0)).len(), 1);
        assert_eq!(mock_gifs("x", Some(500)).len(), MAX_GIF_LIMIT as usize);
        assert!(mock_gifs("", Some(1))[0].id.starts_with("mock-trending"));
    }

    #[test]
    fn test_api_mapping() {
        let body: GifResponse = serde_json::from_value(serde_json::json!({
            "data": [{
                "id": "g1",
                "title": "Wave",
                "images": {
                    "original": {"url": "https://gif/full.gif", "width": "480", "height": "360"},
                    "fixed_width_small": {"url": "https://gif/small.gif", "width": "100", "height": "75"}
                }
            }]
        }))
        .unwrap();

        let gifs: Vec<Gif> = body.data.into_iter().map(Gif::from).collect();
        assert_eq!(gifs[0].width, 480);
        assert_eq!(gifs[0].preview_url, "https://gif/small.gif");
    }

    #[tokio::test]
    async fn test_no_api_key_serves_mock() {
        let client = GifClient::new(config(None));
        assert_eq!(client.search("dogs", Some(2)).await, mock_gifs("dogs", Some(2)));
        assert_eq!(client.trending(Some(2)).await, mock_gifs("", Some(2)));
    }

    #[tokio::test]
    async fn test_upstream_failure_serves_mock() {
        let client = GifClient::new(config(Some("key")));
        assert_eq!(client.search("dogs", Some(2)).await, mock_gifs("dogs", Some(2)));
    }
}
