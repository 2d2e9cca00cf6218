use std::time::Duration;

use jotter_db::SqliteStore;
use tracing::{info, warn};

/// Periodically delete expired sessions from the store.
pub async fn run_session_cleanup(store: SqliteStore, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        match store.prune_expired().await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: pruned {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Session cleanup error: {}", e);
            }
        }
    }
}
