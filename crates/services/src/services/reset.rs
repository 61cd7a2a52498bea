//! Daily-recurrence rollover.
//!
//! Once per logical day, every `daily` task goes back to unstarted and
//! uncompleted, and finished one-off tasks are pruned from the working set
//! (their completions already live in the activity ledger). Whether a day has
//! rolled over is decided purely by comparing calendar-day keys against a
//! per-owner marker, so repeated checks, clock jumps, and DST transitions
//! cannot double-fire.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use db::{
    DBService,
    models::{task::Task, user_settings::UserSettings},
};
use thiserror::Error;
use tracing::{debug, info};
use utils::calendar;

use super::clock::Clock;

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct ResetService {
    db: DBService,
    clock: Arc<dyn Clock>,
}

impl ResetService {
    pub fn new(db: DBService, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// The day the rollover logic considers current: local time shifted back
    /// by the configured boundary, so 02:50 with a 03:00 boundary still
    /// belongs to yesterday. No boundary means plain local midnight.
    fn logical_day(&self, reset_time: Option<NaiveTime>) -> NaiveDate {
        let shift = reset_time
            .map(|t| t.signed_duration_since(NaiveTime::MIN))
            .unwrap_or_else(Duration::zero);
        (self.clock.local_now() - shift).date_naive()
    }

    /// Roll the owner's tasks over if their logical day has changed since the
    /// last rollover. Idempotent: a second call in the same day is a no-op.
    pub async fn reset_if_needed(&self, owner_id: &str) -> Result<bool, ResetError> {
        let settings = UserSettings::find_by_owner(&self.db.pool, owner_id).await?;
        let reset_time = settings
            .as_ref()
            .and_then(|s| s.reset_time.as_deref())
            .and_then(calendar::parse_reset_time);
        let day = self.logical_day(reset_time);
        if settings.as_ref().and_then(|s| s.last_reset_day) == Some(day) {
            debug!(owner_id, %day, "rollover already ran for this day");
            return Ok(false);
        }
        self.reset_now(owner_id, day).await?;
        Ok(true)
    }

    /// Perform the rollover unconditionally: clear daily tasks, prune finished
    /// one-offs, stamp the marker. One transaction, so callers never observe a
    /// partial rollover.
    pub async fn reset_now(&self, owner_id: &str, day: NaiveDate) -> Result<(), ResetError> {
        let mut tx = self.db.pool.begin().await?;
        let cleared = Task::clear_daily(&mut *tx, owner_id).await?;
        let pruned = Task::delete_completed_oneoffs(&mut *tx, owner_id).await?;
        UserSettings::set_last_reset_day(&mut *tx, owner_id, day).await?;
        tx.commit().await?;
        info!(owner_id, %day, cleared, pruned, "daily rollover complete");
        Ok(())
    }
}
