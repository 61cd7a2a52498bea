use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Per-owner settings row: the configured reset boundary and the reset
/// engine's last-rollover-day marker.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserSettings {
    pub id: Uuid,
    pub owner_id: String,
    pub reset_time: Option<String>, // "HH:MM", validated at the API boundary
    pub last_reset_day: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SETTINGS_COLUMNS: &str = "id, owner_id, reset_time, last_reset_day, created_at, updated_at";

impl UserSettings {
    pub async fn find_by_owner(
        pool: &SqlitePool,
        owner_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert_reset_time(
        pool: &SqlitePool,
        owner_id: &str,
        reset_time: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO user_settings (id, owner_id, reset_time) VALUES ($1, $2, $3)
             ON CONFLICT(owner_id) DO UPDATE SET
                 reset_time = excluded.reset_time,
                 updated_at = datetime('now', 'subsec')
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(reset_time)
        .fetch_one(pool)
        .await
    }

    pub async fn set_last_reset_day<'e, E>(
        executor: E,
        owner_id: &str,
        day: NaiveDate,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO user_settings (id, owner_id, last_reset_day) VALUES ($1, $2, $3)
             ON CONFLICT(owner_id) DO UPDATE SET
                 last_reset_day = excluded.last_reset_day,
                 updated_at = datetime('now', 'subsec')",
        )
        .bind(id)
        .bind(owner_id)
        .bind(day)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Settings rows that carry a configured reset boundary, for timer arming.
    pub async fn all_with_reset_time(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE reset_time IS NOT NULL"
        ))
        .fetch_all(pool)
        .await
    }

    /// Every owner the store has seen, from either tasks or settings.
    pub async fn known_owners(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT owner_id FROM user_settings
             UNION
             SELECT DISTINCT owner_id FROM tasks",
        )
        .fetch_all(pool)
        .await
    }
}
