//! Video link recognition
//!
//! Turns YouTube and Vimeo page links into canonical embed URLs. Every
//! YouTube link form for the same video resolves to the same embed URL.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    Youtube,
    Vimeo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEmbed {
    pub provider: VideoProvider,
    pub id: String,
    pub embed_url: String,
}

impl VideoEmbed {
    fn youtube(id: &str) -> Self {
        Self {
            provider: VideoProvider::Youtube,
            id: id.to_string(),
            embed_url: format!("https://www.youtube.com/embed/{}", id),
        }
    }

    fn vimeo(id: &str) -> Self {
        Self {
            provider: VideoProvider::Vimeo,
            id: id.to_string(),
            embed_url: format!("https://player.vimeo.com/video/{}", id),
        }
    }
}

fn is_youtube_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_vimeo_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// Parse a video page URL into an embed, or `None` if it is not a supported link
pub fn parse_video_url(input: &str) -> Option<VideoEmbed> {
    let url = Url::parse(input.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match host {
        "youtube.com" | "m.youtube.com" => {
            let id = match segments.as_slice() {
                ["watch"] => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())?,
                ["shorts", id] | ["embed", id] | ["live", id] => id.to_string(),
                _ => return None,
            };
            is_youtube_id(&id).then(|| VideoEmbed::youtube(&id))
        }
        "youtu.be" => {
            let id = segments.first()?;
            is_youtube_id(id).then(|| VideoEmbed::youtube(id))
        }
        "vimeo.com" => {
            let id = segments.first()?;
            is_vimeo_id(id).then(|| VideoEmbed::vimeo(id))
        }
        "player.vimeo.com" => match segments.as_slice() {
            ["video", id] if is_vimeo_id(id) => Some(VideoEmbed::vimeo(id)),
            _ => None,
        },
        _ => None,
    }
}
