//! Scheduled post publisher
//!
//! Optional in-process alternative to the cron endpoint. Each tick publishes
//! every scheduled post whose time has come.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::services::PostService;

/// Run one publishing pass; returns how many posts went live
pub async fn run_once(posts: &PostService) -> usize {
    let started = Instant::now();
    match posts.publish_due_scheduled(Utc::now()).await {
        Ok(ids) => {
            if !ids.is_empty() {
                tracing::info!(
                    count = ids.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Scheduled publish pass completed"
                );
            }
            ids.len()
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduled publish pass failed");
            0
        }
    }
}

/// Spawn the publisher; `None` when `interval_secs` is 0
pub fn start_scheduled_post_publisher(posts: PostService, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("Scheduled post publisher disabled; relying on cron endpoint");
        return None;
    }

    tracing::info!(interval_secs, "Starting scheduled post publisher");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_once(&posts).await;
        }
    }))
}
