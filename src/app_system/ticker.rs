use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument};

use crate::clients::SessionClient;

/// Drives the session's countdown. Runs until the session actor is gone.
#[instrument(name = "cooldown_ticker", skip(session))]
pub async fn cooldown_ticker(session: SessionClient, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval_timer.tick().await;
        if let Err(e) = session.tick().await {
            debug!(error = %e, "Session closed, stopping ticker");
            break;
        }
    }
}
