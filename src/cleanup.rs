//! Scheduled cleanup of expired sessions and blacklist entries.
//!
//! Reads already ignore expired rows, so this only bounds storage growth.

use crate::db::Database;
use std::time::Duration;
use tracing::{error, info};

/// Default interval between cleanup runs.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Shorter intervals are raised to this.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Rows removed by one cleanup run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub sessions: u64,
    pub revoked: u64,
}

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) -> CleanupReport {
    let mut report = CleanupReport::default();

    match db.sessions().delete_expired().await {
        Ok(count) => {
            if count > 0 {
                info!("Cleaned up {} expired sessions", count);
            }
            report.sessions = count;
        }
        Err(e) => error!("Failed to clean up expired sessions: {}", e),
    }

    match db.blacklist().delete_expired().await {
        Ok(count) => {
            if count > 0 {
                info!("Cleaned up {} expired blacklist entries", count);
            }
            report.revoked = count;
        }
        Err(e) => error!("Failed to clean up blacklist: {}", e),
    }

    report
}

/// Spawn a background task that runs cleanup every `every`, but never more
/// often than `MIN_CLEANUP_INTERVAL`.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database, every: Duration) -> tokio::task::JoinHandle<()> {
    let every = every.max(MIN_CLEANUP_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately; startup already ran a pass.
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}
