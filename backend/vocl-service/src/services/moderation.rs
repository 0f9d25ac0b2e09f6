//! Automated text moderation
//!
//! Text is sent to an external classifier. The gate fails open: when the
//! classifier is missing, slow, or broken the content is treated as safe and
//! the failure is logged. Flagged posts still publish but are queued for
//! moderators through an automatic report.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ModerationConfig;
use crate::db::{post_repo, report_repo};
use crate::error::Result;
use crate::metrics::MODERATION_OUTCOMES;
use crate::models::{ReportTarget, AUTO_FLAGGED_REASON};

/// Shown when user text is rejected outright
pub const CONTENT_VIOLATION: &str = "Content violates community guidelines";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    /// Comma-joined categories that triggered the flag
    pub reason: Option<String>,
}

impl ModerationVerdict {
    pub fn safe() -> Self {
        Self::default()
    }

    pub fn flagged(reason: impl Into<String>) -> Self {
        Self {
            flagged: true,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Moderation request failed: {0}")]
    Request(String),

    #[error("Unexpected moderation response: {0}")]
    InvalidResponse(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    async fn check_text(&self, text: &str) -> std::result::Result<ModerationVerdict, ModerationError>;
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, bool>,
}

fn verdict_from_response(
    response: ModerationResponse,
) -> std::result::Result<ModerationVerdict, ModerationError> {
    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ModerationError::InvalidResponse("empty results".into()))?;

    if !result.flagged {
        return Ok(ModerationVerdict::safe());
    }

    let categories: Vec<String> = result
        .categories
        .into_iter()
        .filter_map(|(name, hit)| hit.then_some(name))
        .collect();

    let reason = if categories.is_empty() {
        "flagged".to_string()
    } else {
        categories.join(", ")
    };
    Ok(ModerationVerdict::flagged(reason))
}

/// Classifier speaking the `{"input": ...}` / `{"results": [...]}` protocol
pub struct HttpModerationProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpModerationProvider {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> std::result::Result<Self, ModerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModerationError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl ModerationProvider for HttpModerationProvider {
    async fn check_text(&self, text: &str) -> std::result::Result<ModerationVerdict, ModerationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "input": text }))
            .send()
            .await
            .map_err(|e| ModerationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModerationError::Request(format!(
                "classifier returned {}",
                response.status()
            )));
        }

        let body: ModerationResponse = response
            .json()
            .await
            .map_err(|e| ModerationError::InvalidResponse(e.to_string()))?;

        verdict_from_response(body)
    }
}

/// Fail-open wrapper around an optional provider
#[derive(Clone)]
pub struct ModerationGate {
    provider: Option<Arc<dyn ModerationProvider>>,
    timeout: Duration,
}

impl ModerationGate {
    pub fn new(provider: Option<Arc<dyn ModerationProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Gate without a classifier; everything passes
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(5))
    }

    pub fn from_config(config: &ModerationConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        let provider = config.api_key.as_ref().and_then(|key| {
            match HttpModerationProvider::new(config.endpoint.clone(), key.clone(), timeout) {
                Ok(p) => Some(Arc::new(p) as Arc<dyn ModerationProvider>),
                Err(e) => {
                    tracing::warn!(error = %e, "Moderation provider unavailable, running without it");
                    None
                }
            }
        });
        Self::new(provider, timeout)
    }

    pub async fn check(&self, text: &str) -> ModerationVerdict {
        let Some(provider) = &self.provider else {
            return ModerationVerdict::safe();
        };
        if text.trim().is_empty() {
            return ModerationVerdict::safe();
        }

        match tokio::time::timeout(self.timeout, provider.check_text(text)).await {
            Ok(Ok(verdict)) => {
                let outcome = if verdict.flagged { "flagged" } else { "safe" };
                MODERATION_OUTCOMES.with_label_values(&[outcome]).inc();
                verdict
            }
            Ok(Err(e)) => {
                MODERATION_OUTCOMES.with_label_values(&["error"]).inc();
                tracing::warn!(error = %e, "Moderation check failed, allowing content");
                ModerationVerdict::safe()
            }
            Err(_) => {
                MODERATION_OUTCOMES.with_label_values(&["error"]).inc();
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Moderation check timed out, allowing content");
                ModerationVerdict::safe()
            }
        }
    }

    /// Check a post and queue it for moderators if flagged
    pub async fn review_post(
        &self,
        pool: &PgPool,
        author_id: Uuid,
        post_id: Uuid,
        text: &str,
    ) -> Result<ModerationVerdict> {
        let verdict = self.check(text).await;
        if !verdict.flagged {
            return Ok(verdict);
        }

        let mut tx = pool.begin().await?;
        report_repo::create_report(
            &mut *tx,
            None,
            ReportTarget::Post.as_str(),
            post_id,
            AUTO_FLAGGED_REASON,
            verdict.reason.as_deref(),
        )
        .await?;
        post_repo::set_flagged(&mut *tx, post_id).await?;
        tx.commit().await?;

        tracing::info!(
            post_id = %post_id,
            author_id = %author_id,
            reason = verdict.reason.as_deref().unwrap_or(""),
            "Post flagged for review"
        );
        Ok(verdict)
    }
}
