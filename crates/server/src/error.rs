use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::task::ValidationError;
use services::services::{activity::ActivityError, reset::ResetError, tasks::TaskUpdateError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    TaskUpdate(#[from] TaskUpdateError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Reset(#[from] ResetError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("missing user header")]
    Unauthorized,
    #[error("not found")]
    NotFound,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::TaskUpdate(TaskUpdateError::NotFound) | ApiError::NotFound => {
                StatusCode::NOT_FOUND
            }
            ApiError::TaskUpdate(TaskUpdateError::Validation(_))
            | ApiError::Validation(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
