pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use db::DBService;
use services::services::{
    activity::ActivityService, clock::Clock, reset::ResetService, tasks::TaskService,
};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: DBService, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn task_service(&self) -> TaskService {
        TaskService::new(self.db.clone(), self.clock.clone())
    }

    pub fn activity_service(&self) -> ActivityService {
        ActivityService::new(self.db.clone(), self.clock.clone())
    }

    pub fn reset_service(&self) -> ResetService {
        ResetService::new(self.db.clone(), self.clock.clone())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
