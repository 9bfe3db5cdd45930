//! Axum Router Configuration

use crate::{handlers, state::AppState};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/voice/pipeline", post(handlers::run_pipeline))
        .route("/voice/announce/{id}", post(handlers::announce_reminder))
        .route(
            "/reminders",
            get(handlers::list_reminders).post(handlers::create_reminder),
        )
        .route("/reminders/complete", post(handlers::complete_reminder))
        .route("/schedule/today", get(handlers::schedule_today))
        .route("/alerts", get(handlers::list_alerts))
        .route("/activity", get(handlers::list_activity))
        .with_state(app_state)
}
