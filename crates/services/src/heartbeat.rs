use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::api::SurveyApi;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Send one ping, logging failure. Returns whether it succeeded.
pub async fn heartbeat_once(api: &dyn SurveyApi) -> bool {
    match api.heartbeat().await {
        Ok(()) => {
            log::debug!("heartbeat ok");
            true
        }
        Err(err) => {
            log::error!("heartbeat failed: {err}");
            false
        }
    }
}

/// Ping every `interval`, starting one interval from now. Never returns.
pub async fn run_heartbeat(api: Arc<dyn SurveyApi>, interval: Duration) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        heartbeat_once(api.as_ref()).await;
    }
}

#[must_use]
pub fn spawn_heartbeat(api: Arc<dyn SurveyApi>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(run_heartbeat(api, interval))
}
