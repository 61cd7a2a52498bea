//! Activity ledger bookkeeping and heatmap aggregation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use db::{
    DBService,
    models::{activity::ActivityEntry, task::Task},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;
use utils::calendar;
use uuid::Uuid;

use super::clock::Clock;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Client-held copy of an unflushed ledger write, sent along with summary
/// requests as a gap filler. Durable rows always win on conflict.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SnapshotEntry {
    pub date: NaiveDate,
    pub task_id: Uuid,
    pub task_title: String,
}

/// One heatmap cell: the distinct titles completed on a day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq)]
pub struct DayActivity {
    pub count: usize,
    pub titles: Vec<String>,
}

pub struct ActivityService {
    db: DBService,
    clock: Arc<dyn Clock>,
}

impl ActivityService {
    pub fn new(db: DBService, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Ledger bookkeeping for a completion flip, invoked exactly once per flip
    /// by the task service. A failed write degrades history for the day; it
    /// must never fail the task mutation that triggered it, so errors are
    /// logged and swallowed here.
    pub async fn record_completion_change(&self, task: &Task, was_completed: bool) {
        if task.completed == was_completed {
            return;
        }
        let today = self.clock.today();

        let result = if task.completed {
            ActivityEntry::upsert(&self.db.pool, &task.owner_id, task.id, &task.title, today)
                .await
                .map(|created| {
                    if created.is_some() {
                        debug!(task_id = %task.id, %today, "recorded completion");
                    }
                })
        } else {
            // Scoped to today only: un-completing a task must not erase the
            // fact that it was completed on an earlier day.
            ActivityEntry::delete_for_day(&self.db.pool, &task.owner_id, task.id, today)
                .await
                .map(|deleted| {
                    if deleted > 0 {
                        debug!(task_id = %task.id, %today, "removed same-day completion");
                    }
                })
        };

        if let Err(e) = result {
            warn!(task_id = %task.id, error = %e, "activity ledger write failed");
        }
    }

    /// Heatmap data: every durable ledger row, today's live completions, and
    /// any snapshot entries the ledger is missing, deduplicated per day by
    /// title. Days before today rely solely on the ledger; stale live state is
    /// assumed already reconciled and is skipped rather than double-counted.
    pub async fn aggregate(
        &self,
        owner_id: &str,
        snapshot: &[SnapshotEntry],
    ) -> Result<BTreeMap<NaiveDate, DayActivity>, ActivityError> {
        let entries = ActivityEntry::find_by_owner(&self.db.pool, owner_id, None).await?;
        let tasks = Task::find_by_owner(&self.db.pool, owner_id).await?;
        let today = self.clock.today();
        let offset = self.clock.local_offset();

        let mut titles: BTreeMap<NaiveDate, BTreeSet<String>> = BTreeMap::new();
        let mut recorded_ids: HashMap<NaiveDate, HashSet<Uuid>> = HashMap::new();
        for entry in entries {
            recorded_ids.entry(entry.date).or_default().insert(entry.task_id);
            titles.entry(entry.date).or_default().insert(entry.task_title);
        }

        let mut seen_live: HashSet<Uuid> = HashSet::new();
        for task in tasks.into_iter().filter(|t| t.completed) {
            let done_at = task.completed_at.unwrap_or(task.created_at);
            let day = calendar::local_day(done_at, offset);
            if day != today || !seen_live.insert(task.id) {
                continue;
            }
            titles.entry(day).or_default().insert(task.title);
        }

        for snap in snapshot {
            let already_recorded = recorded_ids
                .get(&snap.date)
                .is_some_and(|ids| ids.contains(&snap.task_id));
            if already_recorded {
                continue;
            }
            titles
                .entry(snap.date)
                .or_default()
                .insert(snap.task_title.clone());
        }

        Ok(titles
            .into_iter()
            .map(|(day, set)| {
                let titles: Vec<String> = set.into_iter().collect();
                (
                    day,
                    DayActivity {
                        count: titles.len(),
                        titles,
                    },
                )
            })
            .collect())
    }
}
