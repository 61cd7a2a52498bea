//! Foreground-regain rollover trigger.
//!
//! The client calls this whenever the app becomes visible or regains focus;
//! the day-key comparison makes it safe to call arbitrarily often, and it is
//! the primary defense against timers missed while the machine slept.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::UserId, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ResetCheckResponse {
    pub rolled_over: bool,
}

pub async fn check_reset(
    State(state): State<AppState>,
    user: UserId,
) -> Result<ResponseJson<ApiResponse<ResetCheckResponse>>, ApiError> {
    let rolled_over = state.reset_service().reset_if_needed(&user.0).await?;
    Ok(ResponseJson(ApiResponse::success(ResetCheckResponse {
        rolled_over,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/reset/check", post(check_reset))
}
