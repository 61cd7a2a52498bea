use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Durable record of "this task was completed on this calendar day".
///
/// The ledger is independent of the live task row: un-completing a task today
/// removes today's entry only, so history from earlier days survives edits,
/// resets, and pruning.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub owner_id: String,
    pub task_id: Uuid,
    pub task_title: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

const ENTRY_COLUMNS: &str = "id, owner_id, task_id, task_title, date, created_at";

impl ActivityEntry {
    /// Insert the `(task_id, date)` entry if absent. Returns `None` when the
    /// entry already existed; re-completing the same task on the same day
    /// writes nothing.
    pub async fn upsert(
        pool: &SqlitePool,
        owner_id: &str,
        task_id: Uuid,
        task_title: &str,
        date: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO activity_entries (id, owner_id, task_id, task_title, date)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT(task_id, date) DO NOTHING
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(task_id)
        .bind(task_title)
        .bind(date)
        .fetch_optional(pool)
        .await
    }

    /// Delete entries for exactly one `(task_id, date)` pair. Never broader:
    /// this is what keeps prior-day history intact when a task is un-completed.
    pub async fn delete_for_day<'e, E>(
        executor: E,
        owner_id: &str,
        task_id: Uuid,
        date: NaiveDate,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "DELETE FROM activity_entries WHERE owner_id = $1 AND task_id = $2 AND date = $3",
        )
        .bind(owner_id)
        .bind(task_id)
        .bind(date)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_owner(
        pool: &SqlitePool,
        owner_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match date {
            Some(date) => {
                sqlx::query_as::<_, Self>(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM activity_entries
                     WHERE owner_id = $1 AND date = $2
                     ORDER BY created_at DESC"
                ))
                .bind(owner_id)
                .bind(date)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Self>(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM activity_entries
                     WHERE owner_id = $1
                     ORDER BY date DESC, created_at DESC"
                ))
                .bind(owner_id)
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn find_by_task_and_date(
        pool: &SqlitePool,
        task_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM activity_entries WHERE task_id = $1 AND date = $2"
        ))
        .bind(task_id)
        .bind(date)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_task_day() {
        let db = DBService::new_in_memory().await.unwrap();
        let task_id = Uuid::new_v4();

        let first = ActivityEntry::upsert(&db.pool, "user-1", task_id, "Run", day(15))
            .await
            .unwrap();
        assert!(first.is_some());

        // Double-completion on the same day writes nothing.
        let second = ActivityEntry::upsert(&db.pool, "user-1", task_id, "Run", day(15))
            .await
            .unwrap();
        assert!(second.is_none());

        // A different day is a fresh entry.
        let next_day = ActivityEntry::upsert(&db.pool, "user-1", task_id, "Run", day(16))
            .await
            .unwrap();
        assert!(next_day.is_some());

        let all = ActivityEntry::find_by_owner(&db.pool, "user-1", None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        // Newest-first ordering.
        assert_eq!(all[0].date, day(16));
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_one_day() {
        let db = DBService::new_in_memory().await.unwrap();
        let task_id = Uuid::new_v4();
        ActivityEntry::upsert(&db.pool, "user-1", task_id, "Run", day(14))
            .await
            .unwrap();
        ActivityEntry::upsert(&db.pool, "user-1", task_id, "Run", day(15))
            .await
            .unwrap();

        let deleted = ActivityEntry::delete_for_day(&db.pool, "user-1", task_id, day(15))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        // The prior day's history is untouched.
        let remaining = ActivityEntry::find_by_owner(&db.pool, "user-1", None)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].date, day(14));
    }

    #[tokio::test]
    async fn test_find_by_owner_with_date_filter() {
        let db = DBService::new_in_memory().await.unwrap();
        ActivityEntry::upsert(&db.pool, "user-1", Uuid::new_v4(), "Run", day(14))
            .await
            .unwrap();
        ActivityEntry::upsert(&db.pool, "user-1", Uuid::new_v4(), "Read", day(15))
            .await
            .unwrap();
        ActivityEntry::upsert(&db.pool, "user-2", Uuid::new_v4(), "Swim", day(15))
            .await
            .unwrap();

        let filtered = ActivityEntry::find_by_owner(&db.pool, "user-1", Some(day(15)))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].task_title, "Read");
    }
}
