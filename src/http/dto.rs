//! Data Transfer Objects for the HTTP API.
//!
//! These DTOs are used for request/response serialization in the REST API.
//! Core data-model types already derive Serialize/Deserialize and are reused
//! directly in responses.

use serde::{Deserialize, Serialize};

// Re-export existing types that are already serializable
pub use crate::api::{
    ActivityStatus, ChangeRecord, FieldChange, PublishEvent, PublishEventId, ScheduleId,
    ScheduleInfo, StagedChange, UserId,
};
pub use crate::db::models::NewSchedule;
pub use crate::models::cascade::DirectEdit;

/// Request body for storing a new schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    #[serde(flatten)]
    pub schedule: NewSchedule,
}

/// Response for schedule creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleResponse {
    pub schedule_id: ScheduleId,
    pub activity_count: usize,
    pub message: String,
}

/// Schedule list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    pub schedules: Vec<ScheduleInfo>,
    pub total: usize,
}

/// Request body for staging an edit.
///
/// The edit itself arrives in the original wire shape:
/// `{"move_type": "move_start", "value": "2026-03-02"}` or
/// `{"move_type": "change_duration", "value": 5}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRequest {
    pub user_id: UserId,
    pub activity_id: i64,
    #[serde(flatten)]
    pub edit: DirectEdit,
}

/// Response for a staged edit: the full recomputed cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    pub message: String,
    pub direct_count: usize,
    pub cascaded_count: usize,
    pub total_count: usize,
    pub changes: Vec<FieldChange>,
}

/// Query parameters identifying the staging ledger owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingQuery {
    pub user_id: UserId,
}

/// Staged rows for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedListResponse {
    pub changes: Vec<StagedChange>,
}

/// Response for discarding staged changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardResponse {
    pub message: String,
    pub discarded: usize,
}

/// Request body for publishing staged changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub user_id: UserId,
    pub note: String,
}

/// One failed activity update in a partially successful publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishFailureDto {
    pub activity_id: i64,
    pub message: String,
}

/// Response for a publish, fully or partially successful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub message: String,
    pub publish_event_id: PublishEventId,
    pub change_count: usize,
    pub direct_count: usize,
    pub cascaded_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PublishFailureDto>,
}

/// Request body for an immediate status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub user_id: UserId,
    pub status: ActivityStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Response for a status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    pub publish_event_id: PublishEventId,
    pub old_status: ActivityStatus,
    pub new_status: ActivityStatus,
}

/// Publish events of one schedule, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleHistoryResponse {
    pub events: Vec<PublishEvent>,
}

/// One publish event with its change records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHistoryResponse {
    pub event: PublishEvent,
    pub records: Vec<ChangeRecord>,
}

/// Change records affecting one activity, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityHistoryResponse {
    pub records: Vec<ChangeRecord>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Record store connection status
    pub database: String,
}
