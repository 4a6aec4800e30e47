use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    models::{ActivityKey, IngestEventsRequest},
    services::AppState,
};

/// POST /api/v1/scorm/events - Reduce one batch of runtime events
pub async fn ingest_events(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestEventsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!(
        "Ingesting {} SCORM events for user_id={}, activity_id={}",
        req.events.len(),
        req.user_id,
        req.activity_id
    );

    let recording_enabled =
        state.config.recording_enabled && req.recording_enabled.unwrap_or(true);
    let key = ActivityKey::new(req.user_id, req.course_id, req.activity_id);

    let report = state
        .scorm_service()
        .reduce(&key, &req.events, recording_enabled)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record SCORM events: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok((StatusCode::OK, Json(report)))
}

/// GET /api/v1/scorm/state - Activity state with its interactions
pub async fn get_activity_state(
    State(state): State<Arc<AppState>>,
    Query(key): Query<ActivityKey>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    key.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let progress = state
        .scorm_service()
        .get_progress(&key)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("Activity state not found for {}", key),
            )
        })?;

    Ok(Json(progress))
}

/// DELETE /api/v1/scorm/state - Remove activity state and its interactions
pub async fn delete_activity_state(
    State(state): State<Arc<AppState>>,
    Query(key): Query<ActivityKey>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    key.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let deleted = state
        .scorm_service()
        .delete_progress(&key)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if deleted {
        tracing::info!("Deleted activity state for {}", key);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("Activity state not found for {}", key),
        ))
    }
}
