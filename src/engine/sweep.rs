use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::store::InMemoryPhotoStore;

const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

pub fn sweep_period(ttl: Duration) -> Duration {
    (ttl / 4).max(MIN_SWEEP_PERIOD)
}

pub async fn run_abandoned_upload_sweeper(photos: Arc<InMemoryPhotoStore>, ttl: Duration) {
    let Ok(max_age) = chrono::Duration::from_std(ttl) else {
        warn!(ttl_secs = ttl.as_secs(), "abandoned upload ttl out of range, sweeper disabled");
        return;
    };

    let period = sweep_period(ttl);
    info!(ttl_secs = ttl.as_secs(), period_secs = period.as_secs(), "upload sweeper started");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let removed = photos.sweep_abandoned(max_age);
        if removed > 0 {
            info!(removed, remaining = photos.len(), "abandoned uploads swept");
        }
    }
}
