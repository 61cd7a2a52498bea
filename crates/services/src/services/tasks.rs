//! Task mutation rules shared by every route that edits a task.
//!
//! All completion-flag flips funnel through `apply_update`, so the
//! `completed_at` lifecycle rules and the activity-ledger bookkeeping run
//! exactly once per flip no matter which entry point (patch edit, status
//! cycle) caused it.

use std::sync::Arc;

use db::{
    DBService,
    models::task::{Task, UpdateTask, ValidationError},
};
use thiserror::Error;
use utils::calendar;
use uuid::Uuid;

use super::{activity::ActivityService, clock::Clock};

#[derive(Debug, Error)]
pub enum TaskUpdateError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task not found")]
    NotFound,
}

pub struct TaskService {
    db: DBService,
    clock: Arc<dyn Clock>,
    activity: ActivityService,
}

impl TaskService {
    pub fn new(db: DBService, clock: Arc<dyn Clock>) -> Self {
        let activity = ActivityService::new(db.clone(), clock.clone());
        Self { db, clock, activity }
    }

    /// Validate and apply a patch, maintaining the completion lifecycle, then
    /// run ledger bookkeeping if the completion flag flipped.
    pub async fn apply_update(
        &self,
        owner_id: &str,
        id: Uuid,
        patch: UpdateTask,
    ) -> Result<Task, TaskUpdateError> {
        patch.validate()?;
        let current = Task::find_by_id_for_owner(&self.db.pool, id, owner_id)
            .await?
            .ok_or(TaskUpdateError::NotFound)?;
        let was_completed = current.completed;

        let mut next = current.clone();
        patch.apply_to(&mut next);

        if next.completed && !was_completed {
            next.completed_at = Some(self.clock.now());
            next.started = false;
        } else if !next.completed && was_completed {
            // A same-day un-completion clears the stamp. An older stamp stays
            // put so the activity history keeps its original completion day.
            let completed_today = current
                .completed_at
                .map(|at| calendar::local_day(at, self.clock.local_offset()) == self.clock.today())
                .unwrap_or(true);
            if completed_today {
                next.completed_at = None;
            }
        }

        let saved = Task::save(&self.db.pool, &next).await?;
        if saved.completed != was_completed {
            self.activity
                .record_completion_change(&saved, was_completed)
                .await;
        }
        Ok(saved)
    }

    /// Advance the lifecycle one step: none → started → completed → none.
    pub async fn cycle_status(&self, owner_id: &str, id: Uuid) -> Result<Task, TaskUpdateError> {
        let current = Task::find_by_id_for_owner(&self.db.pool, id, owner_id)
            .await?
            .ok_or(TaskUpdateError::NotFound)?;

        let patch = if current.completed {
            UpdateTask {
                completed: Some(false),
                ..Default::default()
            }
        } else if current.started {
            UpdateTask {
                started: Some(false),
                completed: Some(true),
                ..Default::default()
            }
        } else {
            UpdateTask {
                started: Some(true),
                ..Default::default()
            }
        };
        self.apply_update(owner_id, id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
    use db::models::{
        activity::ActivityEntry,
        task::{CreateTask, Recurrence},
    };

    use super::*;
    use crate::services::clock::FixedClock;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        ))
    }

    async fn seed(db: &DBService, title: &str) -> Task {
        Task::create(
            &db.pool,
            "user-1",
            &CreateTask {
                title: title.to_string(),
                notes: None,
                due_date: None,
                recurrence: Some(Recurrence::None),
                project_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_cycle_walks_the_lifecycle() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TaskService::new(db.clone(), clock());
        let task = seed(&db, "Mow lawn").await;

        let task = service.cycle_status("user-1", task.id).await.unwrap();
        assert!(task.started && !task.completed);

        let task = service.cycle_status("user-1", task.id).await.unwrap();
        assert!(!task.started && task.completed);
        assert!(task.completed_at.is_some());

        let task = service.cycle_status("user-1", task.id).await.unwrap();
        assert!(!task.started && !task.completed);
        assert!(task.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_completion_writes_ledger_once() {
        let db = DBService::new_in_memory().await.unwrap();
        let clock = clock();
        let service = TaskService::new(db.clone(), clock.clone());
        let task = seed(&db, "Call dentist").await;

        let patch = UpdateTask {
            completed: Some(true),
            ..Default::default()
        };
        service.apply_update("user-1", task.id, patch.clone()).await.unwrap();
        // Re-asserting completed=true is not a flip: no second ledger write,
        // and the upsert would swallow one anyway.
        service.apply_update("user-1", task.id, patch).await.unwrap();

        let entries = ActivityEntry::find_by_owner(&db.pool, "user-1", None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, clock.today());
        assert_eq!(entries[0].task_title, "Call dentist");
    }

    #[tokio::test]
    async fn test_uncompleting_today_clears_stamp_and_entry() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TaskService::new(db.clone(), clock());
        let task = seed(&db, "Water plants").await;

        let task = service.cycle_status("user-1", task.id).await.unwrap();
        let task = service.cycle_status("user-1", task.id).await.unwrap();
        assert!(task.completed);

        let reverted = service
            .apply_update(
                "user-1",
                task.id,
                UpdateTask {
                    completed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(reverted.completed_at.is_none());
        let entries = ActivityEntry::find_by_owner(&db.pool, "user-1", None)
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_uncompleting_preserves_prior_day_history() {
        let db = DBService::new_in_memory().await.unwrap();
        let clock = clock();
        let service = TaskService::new(db.clone(), clock.clone());
        let task = seed(&db, "Weekly review").await;

        // Completed yesterday; both days have ledger rows (yesterday's from the
        // original completion, today's from a re-completion earlier today).
        let yesterday_instant = clock.now() - Duration::days(1);
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let today = clock.today();
        let mut completed = task.clone();
        completed.completed = true;
        completed.completed_at = Some(yesterday_instant);
        Task::save(&db.pool, &completed).await.unwrap();
        ActivityEntry::upsert(&db.pool, "user-1", task.id, "Weekly review", yesterday)
            .await
            .unwrap();
        ActivityEntry::upsert(&db.pool, "user-1", task.id, "Weekly review", today)
            .await
            .unwrap();

        let reverted = service
            .apply_update(
                "user-1",
                task.id,
                UpdateTask {
                    completed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // The stamp still reflects the original completion instant, and only
        // today's ledger row is gone.
        assert_eq!(reverted.completed_at, Some(yesterday_instant));
        let entries = ActivityEntry::find_by_owner(&db.pool, "user-1", None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, yesterday);
    }

    #[tokio::test]
    async fn test_invalid_patch_rejected_before_any_mutation() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TaskService::new(db.clone(), clock());
        let task = seed(&db, "Read book").await;

        let err = service
            .apply_update("user-1", task.id, UpdateTask::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskUpdateError::Validation(ValidationError::EmptyUpdate)
        ));

        let untouched = Task::find_by_id_for_owner(&db.pool, task.id, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.updated_at, task.updated_at);
    }
}
