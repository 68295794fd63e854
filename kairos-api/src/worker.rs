use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

use kairos_core::repository::HoldStore;

use crate::metrics::Metrics;

/// Periodically removes expired hold entries left behind in the store.
/// TTL expiry already makes them invisible to readers; sweeping keeps the
/// per-day indexes from accumulating dead keys.
pub async fn start_hold_sweeper(store: Arc<dyn HoldStore>, period: Duration, metrics: Metrics) {
    info!("Hold sweeper started, period {:?}", period);

    let mut ticker = interval(period);
    // The first tick completes immediately; consume it so startup stays quiet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match store.sweep_expired().await {
            Ok(0) => debug!("Sweep pass found nothing to remove"),
            Ok(swept) => {
                metrics.holds_swept.inc_by(swept as u64);
                info!("Swept {} expired hold entries", swept);
            }
            Err(err) => error!("Hold sweep failed: {}", err),
        }
    }
}
