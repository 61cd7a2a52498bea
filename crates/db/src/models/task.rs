use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;
use utils::calendar;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "recurrence", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("update contains no fields")]
    EmptyUpdate,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: String,
    pub project_id: Option<Uuid>, // Foreign key to Project
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub recurrence: Recurrence,
    pub started: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>, // Set when completed flips on; see TaskService for the preserve rule
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task enriched with its calendar-day distance to the due date, for list views.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithDue {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub due_in: Option<i64>,
}

impl TaskWithDue {
    pub fn new(task: Task, today: NaiveDate) -> Self {
        let due_in = task
            .due_date
            .map(|date| calendar::days_until(today, Some(date)));
        Self { task, due_in }
    }
}

impl std::ops::Deref for TaskWithDue {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

impl std::ops::DerefMut for TaskWithDue {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.task
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub project_id: Option<Uuid>,
}

impl CreateTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Patch for an existing task. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub project_id: Option<Uuid>,
    pub started: Option<bool>,
    pub completed: Option<bool>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.due_date.is_none()
            && self.recurrence.is_none()
            && self.project_id.is_none()
            && self.started.is_none()
            && self.completed.is_none()
    }

    /// Reject a patch before anything is mutated, locally or durably.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle);
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = Some(notes.clone());
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(recurrence) = &self.recurrence {
            task.recurrence = recurrence.clone();
        }
        if let Some(project_id) = self.project_id {
            task.project_id = Some(project_id);
        }
        if let Some(started) = self.started {
            task.started = started;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

const TASK_COLUMNS: &str = "id, owner_id, project_id, title, notes, due_date, recurrence, started, completed, completed_at, created_at, updated_at";

impl Task {
    pub async fn find_by_id_for_owner(
        pool: &SqlitePool,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_owner(
        pool: &SqlitePool,
        owner_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        owner_id: &str,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let recurrence = data.recurrence.clone().unwrap_or_default();
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO tasks (id, owner_id, project_id, title, notes, due_date, recurrence)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(owner_id)
        .bind(data.project_id)
        .bind(&data.title)
        .bind(&data.notes)
        .bind(data.due_date)
        .bind(recurrence)
        .fetch_one(pool)
        .await
    }

    /// Write every mutable field back. Callers merge patches before saving so
    /// the row always reflects one coherent task state.
    pub async fn save(pool: &SqlitePool, task: &Self) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE tasks
             SET project_id = $3, title = $4, notes = $5, due_date = $6, recurrence = $7,
                 started = $8, completed = $9, completed_at = $10,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND owner_id = $2
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task.id)
        .bind(&task.owner_id)
        .bind(task.project_id)
        .bind(&task.title)
        .bind(&task.notes)
        .bind(task.due_date)
        .bind(task.recurrence.clone())
        .bind(task.started)
        .bind(task.completed)
        .bind(task.completed_at)
        .fetch_one(pool)
        .await
    }

    /// Rollover step: every daily task starts the new day unstarted and
    /// uncompleted. Returns the number of rows touched.
    pub async fn clear_daily<'e, E>(executor: E, owner_id: &str) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE tasks
             SET started = 0, completed = 0, completed_at = NULL,
                 updated_at = datetime('now', 'subsec')
             WHERE owner_id = $1 AND recurrence = $2",
        )
        .bind(owner_id)
        .bind(Recurrence::Daily)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Rollover housekeeping: finished one-off tasks leave the working set.
    pub async fn delete_completed_oneoffs<'e, E>(
        executor: E,
        owner_id: &str,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "DELETE FROM tasks WHERE owner_id = $1 AND recurrence = $2 AND completed = 1",
        )
        .bind(owner_id)
        .bind(Recurrence::None)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid, owner_id: &str) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
