//! Cron jobs for periodic tasks

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use super::ratelimit::RateLimiter;
use super::session::SessionRegistry;
use crate::db::{DbEngine, HistoryTable};

const HOUR: Duration = Duration::from_secs(3600);

/// Sessions untouched for this long are dropped from memory
const SESSION_IDLE: Duration = Duration::from_secs(6 * 3600);

/// State the cleanup job works on
pub struct Housekeeping {
    pub db: DbEngine,
    pub limiter: Arc<RateLimiter>,
    pub sessions: SessionRegistry,
    pub history_retention_days: i64,
}

/// Start all cron jobs
pub fn start_cron_jobs(state: Housekeeping) {
    // Periodic cleanup job (runs every hour)
    tokio::spawn(async move {
        let mut interval = time::interval(HOUR);
        loop {
            interval.tick().await;
            if let Err(e) = cleanup_task(&state).await {
                tracing::error!("Cleanup task error: {}", e);
            }
        }
    });
}

/// Drop replenished rate-limit state and idle sessions, prune old history
async fn cleanup_task(state: &Housekeeping) -> Result<()> {
    let buckets = state.limiter.sweep();
    let sessions = state.sessions.sweep_idle(SESSION_IDLE);

    let mut pruned = 0;
    if state.history_retention_days > 0 {
        let cutoff = Utc::now() - ChronoDuration::days(state.history_retention_days);
        pruned = HistoryTable::prune_older_than(state.db.pool(), cutoff).await?;
    }

    tracing::info!(
        "Cleanup task completed: {} buckets, {} sessions, {} history rows removed",
        buckets,
        sessions,
        pruned
    );
    Ok(())
}
