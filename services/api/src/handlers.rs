//! Axum Handlers for the REST API
//!
//! Voice turns, reminder CRUD, today's schedule, and the caregiver-facing
//! alert and activity feeds.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use memora_core::pipeline::{PipelineReply, PipelineRequest};
use memora_core::reminder::{Frequency, NewReminder, Reminder, ScheduleEntry};
use memora_core::store::{CompletionTarget, ReminderStore};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::{
    models::{
        ActivityRecord, CompleteReminderPayload, CompleteReminderResponse, CreateReminderPayload,
        ErrorResponse, StoredAlert,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Run one voice turn through the pipeline.
pub async fn run_pipeline(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PipelineRequest>,
) -> Result<Json<PipelineReply>, ApiError> {
    let reply = state.pipeline.run(payload).await?;
    Ok(Json(reply))
}

/// Announce a reminder now, opening its confirmation window.
pub async fn announce_reminder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reminder = state
        .store
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Reminder with id '{}' not found", id)))?;
    state.pipeline.announce(&reminder).await;
    Ok((StatusCode::OK, Json(reminder)))
}

pub async fn list_reminders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    Ok(Json(state.store.all().await))
}

pub async fn create_reminder(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateReminderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let time = memora_core::time::normalize(&payload.time).unwrap_or(payload.time);
    let created = state
        .store
        .create(NewReminder {
            title,
            time,
            frequency: payload.frequency.unwrap_or(Frequency::OneTime),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn complete_reminder(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompleteReminderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let target = match (payload.id, payload.title) {
        (Some(id), _) => CompletionTarget::Id(id),
        (None, Some(title)) => CompletionTarget::Title(title),
        (None, None) => {
            return Err(ApiError::BadRequest("id or title is required".to_string()));
        }
    };
    let reminder = state
        .store
        .complete(target)
        .await?
        .ok_or_else(|| ApiError::NotFound("No matching active reminder".to_string()))?;
    Ok(Json(CompleteReminderResponse { ok: true, reminder }))
}

pub async fn schedule_today(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    Ok(Json(state.store.schedule_today().await?))
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoredAlert>>, ApiError> {
    Ok(Json(state.outbox.alerts_snapshot().await))
}

pub async fn list_activity(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ActivityRecord>>, ApiError> {
    Ok(Json(state.activity.snapshot().await))
}
