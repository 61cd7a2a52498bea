use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateProject {
    pub name: String,
}

const PROJECT_COLUMNS: &str = "id, owner_id, name, created_at, updated_at";

impl Project {
    pub async fn find_by_owner(
        pool: &SqlitePool,
        owner_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id_for_owner(
        pool: &SqlitePool,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        owner_id: &str,
        data: &CreateProject,
        project_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO projects (id, owner_id, name) VALUES ($1, $2, $3)
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(project_id)
        .bind(owner_id)
        .bind(&data.name)
        .fetch_one(pool)
        .await
    }

    pub async fn rename(
        pool: &SqlitePool,
        id: Uuid,
        owner_id: &str,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE projects SET name = $3, updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND owner_id = $2
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await
    }

    /// Delete a project. Tasks referencing it are detached, not deleted
    /// (FK `ON DELETE SET NULL`).
    pub async fn delete<'e, E>(executor: E, id: Uuid, owner_id: &str) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::task::{CreateTask, Task},
    };

    #[tokio::test]
    async fn test_delete_detaches_tasks() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = Project::create(
            &db.pool,
            "user-1",
            &CreateProject {
                name: "Garden".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let task = Task::create(
            &db.pool,
            "user-1",
            &CreateTask {
                title: "Plant tomatoes".to_string(),
                notes: None,
                due_date: None,
                recurrence: None,
                project_id: Some(project.id),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert_eq!(task.project_id, Some(project.id));

        let deleted = Project::delete(&db.pool, project.id, "user-1").await.unwrap();
        assert_eq!(deleted, 1);

        let task = Task::find_by_id_for_owner(&db.pool, task.id, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.project_id, None);
    }
}
