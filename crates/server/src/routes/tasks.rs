//! Task CRUD and the status-cycle action.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::task::{CreateTask, Task, TaskWithDue, UpdateTask};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::UserId, error::ApiError};

pub async fn list_tasks(
    State(state): State<AppState>,
    user: UserId,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithDue>>>, ApiError> {
    let today = state.clock().today();
    let tasks = Task::find_by_owner(&state.db().pool, &user.0).await?;
    let tasks = tasks
        .into_iter()
        .map(|task| TaskWithDue::new(task, today))
        .collect();
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_task(
    State(state): State<AppState>,
    user: UserId,
    axum::Json(payload): axum::Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    payload.validate()?;
    let task = Task::create(&state.db().pool, &user.0, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    user: UserId,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::find_by_id_for_owner(&state.db().pool, task_id, &user.0)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    user: UserId,
    Path(task_id): Path<Uuid>,
    axum::Json(patch): axum::Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = state
        .task_service()
        .apply_update(&user.0, task_id, patch)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn cycle_task(
    State(state): State<AppState>,
    user: UserId,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = state.task_service().cycle_status(&user.0, task_id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: UserId,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Task::delete(&state.db().pool, task_id, &user.0).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{task_id}/cycle", post(cycle_task))
}
