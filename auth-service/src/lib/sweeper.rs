//! Periodic cleanup of expired revocations, sessions, rate-limit counters and
//! pending OAuth states.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::domain::auth::ports::AuthServicePort;
use crate::domain::rate_limit::ports::RateLimiter;
use crate::outbound::providers::OAuthStateStore;

pub struct Sweeper {
    auth_service: Arc<dyn AuthServicePort>,
    rate_limiter: Arc<dyn RateLimiter>,
    oauth_states: Arc<OAuthStateStore>,
    period: Duration,
}

impl Sweeper {
    pub fn new(
        auth_service: Arc<dyn AuthServicePort>,
        rate_limiter: Arc<dyn RateLimiter>,
        oauth_states: Arc<OAuthStateStore>,
        period: Duration,
    ) -> Self {
        Self {
            auth_service,
            rate_limiter,
            oauth_states,
            period,
        }
    }

    /// One pass over every store. A failing store is logged and skipped.
    pub async fn run_once(&self) {
        let now = Utc::now();

        match self.auth_service.sweep_expired(now).await {
            Ok(report) => tracing::debug!(
                revocations_purged = report.revocations_purged,
                sessions_swept = report.sessions_swept,
                "Expired credentials swept"
            ),
            Err(e) => tracing::warn!(error = %e, "Credential sweep failed"),
        }

        let counters = self.rate_limiter.sweep(now);
        let states = self.oauth_states.sweep();
        if counters > 0 || states > 0 {
            tracing::debug!(counters, states, "Idle rate-limit counters and OAuth states dropped");
        }
    }

    /// Sweep every `period` until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => self.run_once().await,
                }
            }
        })
    }
}
