pub mod activity;
pub mod projects;
pub mod reset;
pub mod settings;
pub mod tasks;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(tasks::router())
        .merge(projects::router())
        .merge(activity::router())
        .merge(settings::router())
        .merge(reset::router())
}
