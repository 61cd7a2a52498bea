//! Background driver for the reset engine.
//!
//! Sweeps every known owner once at startup, then keeps exactly one timer
//! armed for the next reset boundary. The timer self-reschedules after each
//! firing; the foreground-regain HTTP trigger covers missed timers (a laptop
//! asleep through midnight is caught on the next check, because the decision
//! is a day-key comparison, not a timer guarantee).

use std::sync::Arc;
use std::time::Duration;

use db::{DBService, models::user_settings::UserSettings};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use utils::calendar;

use super::{clock::Clock, reset::ResetService};

/// Re-check interval when no owner has a configured reset boundary.
const FALLBACK_CHECK: Duration = Duration::from_secs(24 * 60 * 60);

pub struct ResetScheduler {
    db: DBService,
    clock: Arc<dyn Clock>,
    reset: ResetService,
    shutdown: CancellationToken,
}

/// Handle for stopping a spawned scheduler.
pub struct ResetSchedulerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ResetSchedulerHandle {
    /// Cancel the armed timer and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

impl ResetScheduler {
    /// Spawn the background rollover loop.
    pub fn spawn(db: DBService, clock: Arc<dyn Clock>) -> ResetSchedulerHandle {
        let token = CancellationToken::new();
        let scheduler = Self {
            reset: ResetService::new(db.clone(), clock.clone()),
            db,
            clock,
            shutdown: token.clone(),
        };
        let handle = tokio::spawn(async move {
            scheduler.run().await;
        });
        ResetSchedulerHandle { token, handle }
    }

    async fn run(&self) {
        info!("starting reset scheduler");
        self.check_all_owners().await;

        loop {
            let delay = self.next_check_delay().await;
            debug!(?delay, "armed rollover timer");
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("reset scheduler stopped");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    self.check_all_owners().await;
                }
            }
        }
    }

    /// Run `reset_if_needed` for every owner the store knows about.
    async fn check_all_owners(&self) {
        let owners = match UserSettings::known_owners(&self.db.pool).await {
            Ok(owners) => owners,
            Err(e) => {
                error!("failed to list owners for rollover check: {e}");
                return;
            }
        };

        for owner in owners {
            match self.reset.reset_if_needed(&owner).await {
                Ok(true) => info!(owner_id = %owner, "rollover performed"),
                Ok(false) => {}
                Err(e) => warn!(owner_id = %owner, error = %e, "rollover check failed"),
            }
        }
    }

    /// Shortest delay until any owner's next configured boundary, or the 24 h
    /// re-check fallback when none is configured. Clamped away from zero so a
    /// boundary landing exactly on "now" cannot spin the loop.
    async fn next_check_delay(&self) -> Duration {
        let settings = match UserSettings::all_with_reset_time(&self.db.pool).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("failed to load reset times, using fallback interval: {e}");
                return FALLBACK_CHECK;
            }
        };

        let now = self.clock.local_now();
        settings
            .iter()
            .filter_map(|s| s.reset_time.as_deref())
            .filter_map(calendar::parse_reset_time)
            .map(|reset| calendar::delay_until(now, reset))
            .min()
            .and_then(|delay| delay.to_std().ok())
            .map(|delay| delay.max(Duration::from_secs(1)))
            .unwrap_or(FALLBACK_CHECK)
    }
}
