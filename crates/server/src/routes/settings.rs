use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::user_settings::UserSettings;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::{calendar, response::ApiResponse};

use crate::{AppState, auth::UserId, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateSettings {
    /// `"HH:MM"`, or `null` to fall back to the 24-hour re-check.
    pub reset_time: Option<String>,
}

pub async fn get_settings(
    State(state): State<AppState>,
    user: UserId,
) -> Result<ResponseJson<ApiResponse<Option<UserSettings>>>, ApiError> {
    let settings = UserSettings::find_by_owner(&state.db().pool, &user.0).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    user: UserId,
    axum::Json(payload): axum::Json<UpdateSettings>,
) -> Result<ResponseJson<ApiResponse<UserSettings>>, ApiError> {
    if let Some(raw) = payload.reset_time.as_deref() {
        if calendar::parse_reset_time(raw).is_none() {
            return Err(ApiError::BadRequest(format!(
                "invalid reset time '{raw}', expected HH:MM"
            )));
        }
    }
    let settings =
        UserSettings::upsert_reset_time(&state.db().pool, &user.0, payload.reset_time).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}
