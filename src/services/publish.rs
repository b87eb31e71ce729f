//! Publish service: commits staged changes with an audit trail.
//!
//! Publishing is a deliberate multi-step workflow, not a database
//! transaction: the publish event and change records are written first, then
//! each activity's merged field update is applied best-effort. When one or
//! more activity updates fail, the already-written audit trail is NOT rolled
//! back; the caller receives a partial-failure report and should treat the
//! audit trail as the source of truth.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::{
    ActivityId, ChangedField, FieldValue, MoveType, PublishEventId, ScheduleId, UserId,
};
use crate::db::models::{ActivityFieldUpdate, NewChangeRecord, NewPublishEvent};
use crate::db::repository::FullRepository;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::staging::StageLocks;

/// Summary of a completed publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub publish_event_id: PublishEventId,
    pub change_count: usize,
    pub direct_count: usize,
    pub cascaded_count: usize,
}

/// One live-record update that failed during publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishFailure {
    pub activity_id: ActivityId,
    pub message: String,
}

/// Outcome of a publish: fully applied, or applied with per-activity
/// failures after the audit trail was already written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PublishOutcome {
    Success(PublishReceipt),
    PartialFailure {
        receipt: PublishReceipt,
        failures: Vec<PublishFailure>,
    },
}

impl PublishOutcome {
    pub fn receipt(&self) -> &PublishReceipt {
        match self {
            PublishOutcome::Success(receipt) => receipt,
            PublishOutcome::PartialFailure { receipt, .. } => receipt,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Success(_))
    }
}

/// Publish transaction over one record store.
pub struct PublishService {
    repo: Arc<dyn FullRepository>,
    locks: Arc<StageLocks>,
}

impl PublishService {
    pub fn new(repo: Arc<dyn FullRepository>, locks: Arc<StageLocks>) -> Self {
        Self { repo, locks }
    }

    /// Publish all staged changes of a (user, schedule) pair.
    ///
    /// Requires a non-blank note and a non-empty ledger. Writes one publish
    /// event plus one change record per staged row, applies the merged field
    /// updates per activity, and clears the ledger regardless of per-activity
    /// update outcomes.
    pub async fn publish(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
        note: &str,
    ) -> ServiceResult<PublishOutcome> {
        let note = note.trim();
        if note.is_empty() {
            return Err(ServiceError::Validation(
                "Publish note is required".to_string(),
            ));
        }

        let key_lock = self.locks.handle(user_id, schedule_id);
        let _guard = key_lock.lock().await;

        let staged = self.repo.fetch_staged(user_id, schedule_id).await?;
        if staged.is_empty() {
            return Err(ServiceError::Validation(
                "No staged changes to publish".to_string(),
            ));
        }

        let direct_count = staged.iter().filter(|row| row.is_direct_edit).count();
        let cascaded_count = staged.len() - direct_count;
        let move_types: Vec<MoveType> = staged
            .iter()
            .map(|row| row.move_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let now = Utc::now();

        // 1. Audit trail head record.
        let event = self
            .repo
            .insert_publish_event(NewPublishEvent {
                user_id,
                schedule_id,
                note: note.to_string(),
                move_types,
                change_count: staged.len(),
                direct_edit_count: direct_count,
                cascaded_count,
                published_at: now,
            })
            .await?;

        // 2. One change record per staged row.
        let records: Vec<NewChangeRecord> = staged
            .iter()
            .map(|row| NewChangeRecord {
                publish_event_id: event.id,
                activity_id: row.activity_id,
                schedule_id,
                field: row.field,
                old_value: row.original_value,
                new_value: row.staged_value,
                is_direct_edit: row.is_direct_edit,
                source_activity_id: row.source_activity_id,
                changed_at: now,
            })
            .collect();
        self.repo.insert_change_records(records).await?;

        // 3. Merge staged rows into one field update per activity and apply.
        let mut updates: BTreeMap<ActivityId, ActivityFieldUpdate> = BTreeMap::new();
        for row in &staged {
            let update = updates.entry(row.activity_id).or_insert_with(|| {
                ActivityFieldUpdate {
                    modified_by: Some(user_id),
                    modified_at: Some(now),
                    ..Default::default()
                }
            });
            match (row.field, row.staged_value) {
                (ChangedField::StartDate, FieldValue::Date(date)) => {
                    update.start_date = Some(date);
                }
                (ChangedField::EndDate, FieldValue::Date(date)) => {
                    update.end_date = Some(date);
                }
                (ChangedField::Duration, FieldValue::Days(days)) => {
                    update.duration = Some(days);
                }
                (ChangedField::Status, FieldValue::Status(status)) => {
                    update.status = Some(status);
                }
                (field, value) => {
                    log::warn!(
                        "skipping staged row with mismatched value for {}: {}",
                        field,
                        value
                    );
                }
            }
        }

        let mut failures: Vec<PublishFailure> = Vec::new();
        for (activity_id, update) in &updates {
            if let Err(e) = self.repo.update_activity_fields(*activity_id, update).await {
                failures.push(PublishFailure {
                    activity_id: *activity_id,
                    message: e.to_string(),
                });
            }
        }

        // 4. Clear staging regardless of per-activity update outcomes.
        self.repo.delete_staged(user_id, schedule_id).await?;

        let receipt = PublishReceipt {
            publish_event_id: event.id,
            change_count: staged.len(),
            direct_count,
            cascaded_count,
        };

        if failures.is_empty() {
            log::info!(
                "published event {} for user {} on schedule {} ({} changes)",
                event.id,
                user_id,
                schedule_id,
                staged.len()
            );
            Ok(PublishOutcome::Success(receipt))
        } else {
            log::warn!(
                "published event {} with {} failed activity updates",
                event.id,
                failures.len()
            );
            Ok(PublishOutcome::PartialFailure { receipt, failures })
        }
    }
}
