//! Activity ledger routes: raw entries, batch writes, scoped deletes, and
//! the aggregated heatmap summary.

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use db::models::activity::ActivityEntry;
use serde::{Deserialize, Serialize};
use services::services::activity::{DayActivity, SnapshotEntry};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::UserId, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivityItem {
    pub task_id: Uuid,
    pub task_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateActivityBatch {
    pub date: NaiveDate,
    pub items: Vec<ActivityItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct SummaryRequest {
    #[serde(default)]
    pub snapshot: Vec<SnapshotEntry>,
}

pub async fn list_activity(
    State(state): State<AppState>,
    user: UserId,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityEntry>>>, ApiError> {
    let entries = ActivityEntry::find_by_owner(&state.db().pool, &user.0, query.date).await?;
    Ok(ResponseJson(ApiResponse::success(entries)))
}

/// Batch upsert: one durable write per distinct task per day. Entries that
/// already exist are returned as-is rather than duplicated.
pub async fn record_activity(
    State(state): State<AppState>,
    user: UserId,
    axum::Json(payload): axum::Json<CreateActivityBatch>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityEntry>>>, ApiError> {
    let mut entries = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let entry = match ActivityEntry::upsert(
            &state.db().pool,
            &user.0,
            item.task_id,
            &item.task_title,
            payload.date,
        )
        .await?
        {
            Some(created) => Some(created),
            None => {
                ActivityEntry::find_by_task_and_date(&state.db().pool, item.task_id, payload.date)
                    .await?
            }
        };
        if let Some(entry) = entry {
            entries.push(entry);
        }
    }
    Ok(ResponseJson(ApiResponse::success(entries)))
}

/// Scoped strictly to one `(task_id, date)` pair.
pub async fn delete_activity(
    State(state): State<AppState>,
    user: UserId,
    Path((task_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let deleted =
        ActivityEntry::delete_for_day(&state.db().pool, &user.0, task_id, date).await?;
    Ok(ResponseJson(ApiResponse::success(deleted)))
}

pub async fn activity_summary(
    State(state): State<AppState>,
    user: UserId,
    axum::Json(payload): axum::Json<SummaryRequest>,
) -> Result<ResponseJson<ApiResponse<BTreeMap<NaiveDate, DayActivity>>>, ApiError> {
    let summary = state
        .activity_service()
        .aggregate(&user.0, &payload.snapshot)
        .await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/activity", get(list_activity).post(record_activity))
        .route("/activity/summary", post(activity_summary))
        .route("/activity/{task_id}/{date}", delete(delete_activity))
}
