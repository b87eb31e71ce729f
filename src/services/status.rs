//! Immediate status transitions.
//!
//! A narrow, non-cascading sibling of the staging flow: transitions one
//! activity's status field directly, with its own single-change publish
//! event so the audit trail stays uniform. Status is not part of the
//! dependency propagation model, so no cascade is computed.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::{
    ActivityId, ActivityStatus, ChangedField, FieldValue, MoveType, PublishEventId, ScheduleId,
    UserId,
};
use crate::db::models::{ActivityFieldUpdate, NewChangeRecord, NewPublishEvent};
use crate::db::repository::FullRepository;
use crate::services::error::{ServiceError, ServiceResult};

/// Summary of a completed status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReceipt {
    pub publish_event_id: PublishEventId,
    pub old_status: ActivityStatus,
    pub new_status: ActivityStatus,
}

/// Status transition operations over one record store.
pub struct StatusService {
    repo: Arc<dyn FullRepository>,
}

impl StatusService {
    pub fn new(repo: Arc<dyn FullRepository>) -> Self {
        Self { repo }
    }

    /// Transition one activity's status, bypassing staging.
    ///
    /// Valid targets are `Completed` and `Approved`. Rejected when the
    /// activity already has the requested status, or is already `Approved`
    /// (terminal). The note defaults to "Status changed to <status>".
    pub async fn set_status(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        schedule_id: ScheduleId,
        new_status: ActivityStatus,
        note: Option<&str>,
    ) -> ServiceResult<StatusReceipt> {
        if !new_status.is_valid_transition_target() {
            return Err(ServiceError::Validation(format!(
                "Status must be '{}' or '{}'",
                ActivityStatus::Completed,
                ActivityStatus::Approved
            )));
        }

        let activity = self
            .repo
            .fetch_activity(activity_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Activity {} not found", activity_id))
            })?;
        if activity.schedule_id != schedule_id {
            return Err(ServiceError::NotFound(format!(
                "Activity {} not found in schedule {}",
                activity_id, schedule_id
            )));
        }

        let old_status = activity.status;
        if old_status == new_status {
            return Err(ServiceError::Validation(format!(
                "Status is already {}",
                new_status
            )));
        }
        if old_status.is_terminal() {
            return Err(ServiceError::Validation(format!(
                "Cannot change status - activity is already {}",
                old_status
            )));
        }

        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Status changed to {}", new_status));
        let now = Utc::now();

        let event = self
            .repo
            .insert_publish_event(NewPublishEvent {
                user_id,
                schedule_id,
                note,
                move_types: vec![MoveType::StatusUpdate],
                change_count: 1,
                direct_edit_count: 1,
                cascaded_count: 0,
                published_at: now,
            })
            .await?;

        self.repo
            .insert_change_records(vec![NewChangeRecord {
                publish_event_id: event.id,
                activity_id,
                schedule_id,
                field: ChangedField::Status,
                old_value: Some(FieldValue::Status(old_status)),
                new_value: FieldValue::Status(new_status),
                is_direct_edit: true,
                source_activity_id: None,
                changed_at: now,
            }])
            .await?;

        self.repo
            .update_activity_fields(
                activity_id,
                &ActivityFieldUpdate {
                    status: Some(new_status),
                    modified_by: Some(user_id),
                    modified_at: Some(now),
                    ..Default::default()
                },
            )
            .await?;

        log::info!(
            "activity {} status {} -> {} (event {})",
            activity_id,
            old_status,
            new_status,
            event.id
        );

        Ok(StatusReceipt {
            publish_event_id: event.id,
            old_status,
            new_status,
        })
    }
}
