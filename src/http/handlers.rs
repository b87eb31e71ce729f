//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the service
//! layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::dto::{
    ActivityHistoryResponse, CreateScheduleRequest, CreateScheduleResponse, DiscardResponse,
    EventHistoryResponse, HealthResponse, PublishFailureDto, PublishRequest, PublishResponse,
    ScheduleHistoryResponse, ScheduleListResponse, StageRequest, StageResponse,
    StagedListResponse, StagingQuery, StatusRequest, StatusResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{ActivityId, PublishEventId, ScheduleId};
use crate::services::PublishOutcome;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the record
/// store is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Schedules
// =============================================================================

/// GET /v1/schedules
///
/// List all schedules in the record store.
pub async fn list_schedules(State(state): State<AppState>) -> HandlerResult<ScheduleListResponse> {
    let schedules = state.repository.list_schedules().await?;
    let total = schedules.len();

    Ok(Json(ScheduleListResponse { schedules, total }))
}

/// POST /v1/schedules
///
/// Store a new schedule (activities, dependencies, calendar days).
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<CreateScheduleResponse>), AppError> {
    let info = state.repository.store_schedule(request.schedule).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateScheduleResponse {
            schedule_id: info.schedule_id,
            activity_count: info.activity_count,
            message: format!("Schedule '{}' stored", info.schedule_name),
        }),
    ))
}

// =============================================================================
// Staging
// =============================================================================

/// POST /v1/schedules/{schedule_id}/staging
///
/// Stage a move-start or change-duration edit; responds with the full
/// recomputed cascade for review.
pub async fn stage_edit(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Json(request): Json<StageRequest>,
) -> HandlerResult<StageResponse> {
    let outcome = state
        .staging
        .stage(
            request.user_id,
            ScheduleId::new(schedule_id),
            ActivityId::new(request.activity_id),
            request.edit,
        )
        .await?;

    let message = if outcome.changes.is_empty() {
        "No changes detected".to_string()
    } else {
        "Changes staged successfully".to_string()
    };

    Ok(Json(StageResponse {
        message,
        direct_count: outcome.direct_count,
        cascaded_count: outcome.cascaded_count,
        total_count: outcome.total_count(),
        changes: outcome.changes,
    }))
}

/// GET /v1/schedules/{schedule_id}/staging?user_id=...
///
/// Get the user's staged changes for a schedule.
pub async fn get_staged(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Query(query): Query<StagingQuery>,
) -> HandlerResult<StagedListResponse> {
    let changes = state
        .staging
        .staged_changes(query.user_id, ScheduleId::new(schedule_id))
        .await?;

    Ok(Json(StagedListResponse { changes }))
}

/// DELETE /v1/schedules/{schedule_id}/staging?user_id=...
///
/// Discard all of the user's staged changes for a schedule.
pub async fn discard_staged(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Query(query): Query<StagingQuery>,
) -> HandlerResult<DiscardResponse> {
    let discarded = state
        .staging
        .discard_all(query.user_id, ScheduleId::new(schedule_id))
        .await?;

    Ok(Json(DiscardResponse {
        message: "All staged changes discarded".to_string(),
        discarded,
    }))
}

/// POST /v1/schedules/{schedule_id}/staging/publish
///
/// Publish all staged changes. A publish where some live-record updates
/// failed responds 207 with the failing activities; the audit trail is
/// already written in that case.
pub async fn publish_staged(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Json(request): Json<PublishRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), AppError> {
    let outcome = state
        .publish
        .publish(request.user_id, ScheduleId::new(schedule_id), &request.note)
        .await?;

    let receipt = outcome.receipt().clone();
    match outcome {
        PublishOutcome::Success(_) => Ok((
            StatusCode::OK,
            Json(PublishResponse {
                message: "Published successfully".to_string(),
                publish_event_id: receipt.publish_event_id,
                change_count: receipt.change_count,
                direct_count: receipt.direct_count,
                cascaded_count: receipt.cascaded_count,
                errors: vec![],
            }),
        )),
        PublishOutcome::PartialFailure { failures, .. } => Ok((
            StatusCode::MULTI_STATUS,
            Json(PublishResponse {
                message: "Published with some errors".to_string(),
                publish_event_id: receipt.publish_event_id,
                change_count: receipt.change_count,
                direct_count: receipt.direct_count,
                cascaded_count: receipt.cascaded_count,
                errors: failures
                    .into_iter()
                    .map(|f| PublishFailureDto {
                        activity_id: f.activity_id.value(),
                        message: f.message,
                    })
                    .collect(),
            }),
        )),
    }
}

// =============================================================================
// Status Transitions
// =============================================================================

/// POST /v1/schedules/{schedule_id}/activities/{activity_id}/status
///
/// Immediately transition an activity's status (no staging, no cascade).
pub async fn set_status(
    State(state): State<AppState>,
    Path((schedule_id, activity_id)): Path<(i64, i64)>,
    Json(request): Json<StatusRequest>,
) -> HandlerResult<StatusResponse> {
    let receipt = state
        .status
        .set_status(
            request.user_id,
            ActivityId::new(activity_id),
            ScheduleId::new(schedule_id),
            request.status,
            request.note.as_deref(),
        )
        .await?;

    Ok(Json(StatusResponse {
        message: "Status updated".to_string(),
        publish_event_id: receipt.publish_event_id,
        old_status: receipt.old_status,
        new_status: receipt.new_status,
    }))
}

// =============================================================================
// History
// =============================================================================

/// GET /v1/schedules/{schedule_id}/history
///
/// Publish events for a schedule, newest first.
pub async fn schedule_history(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> HandlerResult<ScheduleHistoryResponse> {
    let events = state
        .repository
        .fetch_publish_events(ScheduleId::new(schedule_id))
        .await?;

    Ok(Json(ScheduleHistoryResponse { events }))
}

/// GET /v1/events/{event_id}
///
/// One publish event with all of its change records.
pub async fn event_history(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> HandlerResult<EventHistoryResponse> {
    let event_id = PublishEventId::new(event_id);
    let event = state
        .repository
        .fetch_publish_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Publish event {} not found", event_id)))?;
    let records = state
        .repository
        .fetch_change_records_for_event(event_id)
        .await?;

    Ok(Json(EventHistoryResponse { event, records }))
}

/// GET /v1/activities/{activity_id}/history
///
/// Change records affecting one activity, newest first.
pub async fn activity_history(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> HandlerResult<ActivityHistoryResponse> {
    let records = state
        .repository
        .fetch_change_records_for_activity(ActivityId::new(activity_id))
        .await?;

    Ok(Json(ActivityHistoryResponse { records }))
}
