//! Staging service: the reviewable, disposable edit ledger.
//!
//! Holds the single current already-cascaded edit set per (user, schedule)
//! pair. Every `stage` call reconstructs the full direct-edit set from the
//! existing ledger, recomputes the entire cascade from live snapshots, and
//! replaces the ledger wholesale. Recomputing from the source of truth (not
//! from previously staged values) is what makes staging idempotent: staging
//! the same edit twice yields the same rows, and edits never compound.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ActivityId, ChangedField, FieldChange, MoveType, ScheduleId, StagedChange, UserId};
use crate::db::models::NewStagedChange;
use crate::db::repository::FullRepository;
use crate::models::calendar::WorkdayCalendar;
use crate::models::cascade::{calculate_cascade, DirectEdit};
use crate::services::error::{ServiceError, ServiceResult};

/// Per-(user, schedule) mutual exclusion for ledger mutations.
///
/// The record store does not serialize concurrent stage/publish calls on the
/// same key, so the services do: one mutation in flight per key, while
/// different keys proceed independently. Shared between the staging and
/// publish services.
#[derive(Default)]
pub struct StageLocks {
    inner: parking_lot::Mutex<HashMap<(UserId, ScheduleId), Arc<tokio::sync::Mutex<()>>>>,
}

impl StageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the given key's mutex, creating it on first use.
    pub(crate) fn handle(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock();
        map.entry((user_id, schedule_id))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Result of staging one edit: the full recomputed cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub direct_count: usize,
    pub cascaded_count: usize,
    pub changes: Vec<FieldChange>,
}

impl StageOutcome {
    pub fn total_count(&self) -> usize {
        self.changes.len()
    }
}

/// Staging ledger operations for one record store.
pub struct StagingService {
    repo: Arc<dyn FullRepository>,
    locks: Arc<StageLocks>,
}

impl StagingService {
    pub fn new(repo: Arc<dyn FullRepository>, locks: Arc<StageLocks>) -> Self {
        Self { repo, locks }
    }

    /// Stage one direct edit, merging it into the user's in-progress edit
    /// set for the schedule and recomputing the full cascade.
    ///
    /// A re-edit of an already-staged activity replaces that activity's
    /// previous direct edit; direct edits on other activities are preserved
    /// and recombined before recomputation. When the recomputed cascade is
    /// empty the ledger ends empty: an empty stage is equivalent to "no
    /// pending edits".
    pub async fn stage(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
        activity_id: ActivityId,
        edit: DirectEdit,
    ) -> ServiceResult<StageOutcome> {
        if let DirectEdit::ChangeDuration(duration) = edit {
            if duration < 1 {
                return Err(ServiceError::Validation(format!(
                    "Duration must be at least 1 workday, got {}",
                    duration
                )));
            }
        }

        let key_lock = self.locks.handle(user_id, schedule_id);
        let _guard = key_lock.lock().await;

        let activities = self.repo.fetch_activities(schedule_id).await?;
        if !activities.iter().any(|a| a.id == activity_id) {
            return Err(ServiceError::NotFound(format!(
                "Activity {} not found in schedule {}",
                activity_id, schedule_id
            )));
        }

        let dependencies = self.repo.fetch_dependencies(schedule_id).await?;
        let calendar_days = self.repo.fetch_calendar_days(None).await?;
        let calendar = WorkdayCalendar::new(&calendar_days);

        let existing = self.repo.fetch_staged(user_id, schedule_id).await?;

        // Rebuild the full direct-edit set from the ledger, dropping any
        // previous edit of the activity being staged now.
        let mut direct_edits = rebuild_direct_edits(&existing, activity_id);
        direct_edits.insert(activity_id, edit);

        let changes = calculate_cascade(&direct_edits, &activities, &dependencies, &calendar)?;

        // Disposable-ledger pattern: always replace, never patch.
        self.repo.delete_staged(user_id, schedule_id).await?;

        if !changes.is_empty() {
            let rows: Vec<NewStagedChange> = changes
                .iter()
                .map(|change| NewStagedChange {
                    user_id,
                    schedule_id,
                    activity_id: change.activity_id,
                    move_type: originating_move_type(change, &direct_edits, edit),
                    field: change.field,
                    original_value: change.old_value,
                    staged_value: change.new_value,
                    is_direct_edit: change.is_direct_edit,
                    source_activity_id: change.source_activity_id,
                })
                .collect();
            self.repo.insert_staged(rows).await?;
        }

        let direct_count = changes.iter().filter(|c| c.is_direct_edit).count();
        let cascaded_count = changes.len() - direct_count;
        log::debug!(
            "staged {} changes ({} direct, {} cascaded) for user {} on schedule {}",
            changes.len(),
            direct_count,
            cascaded_count,
            user_id,
            schedule_id
        );

        Ok(StageOutcome {
            direct_count,
            cascaded_count,
            changes,
        })
    }

    /// Current staged rows, ordered by activity and field for review UIs.
    pub async fn staged_changes(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> ServiceResult<Vec<StagedChange>> {
        let mut rows = self.repo.fetch_staged(user_id, schedule_id).await?;
        rows.sort_by_key(|row| (row.activity_id, row.field, row.id));
        Ok(rows)
    }

    /// Discard all staged rows for the pair. No other side effects.
    pub async fn discard_all(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> ServiceResult<usize> {
        let key_lock = self.locks.handle(user_id, schedule_id);
        let _guard = key_lock.lock().await;

        let deleted = self.repo.delete_staged(user_id, schedule_id).await?;
        log::debug!(
            "discarded {} staged changes for user {} on schedule {}",
            deleted,
            user_id,
            schedule_id
        );
        Ok(deleted)
    }
}

/// Re-derive `{activity -> direct edit}` from the ledger's direct rows,
/// excluding `replaced_activity` (its old edit, if any, is superseded).
fn rebuild_direct_edits(
    existing: &[StagedChange],
    replaced_activity: ActivityId,
) -> BTreeMap<ActivityId, DirectEdit> {
    let direct_ids: BTreeSet<ActivityId> = existing
        .iter()
        .filter(|row| row.is_direct_edit)
        .map(|row| row.activity_id)
        .collect();

    let mut edits = BTreeMap::new();
    for id in direct_ids {
        if id == replaced_activity {
            continue;
        }
        let rows: Vec<&StagedChange> = existing
            .iter()
            .filter(|row| row.activity_id == id && row.is_direct_edit)
            .collect();
        let Some(move_type) = rows.first().map(|row| row.move_type) else {
            continue;
        };
        match move_type {
            MoveType::MoveStart => {
                if let Some(start) = rows
                    .iter()
                    .find(|row| row.field == ChangedField::StartDate)
                    .and_then(|row| row.staged_value.as_date())
                {
                    edits.insert(id, DirectEdit::MoveStart(start));
                }
            }
            MoveType::ChangeDuration => {
                if let Some(duration) = rows
                    .iter()
                    .find(|row| row.field == ChangedField::Duration)
                    .and_then(|row| row.staged_value.as_days())
                {
                    edits.insert(id, DirectEdit::ChangeDuration(duration));
                }
            }
            // Status updates bypass staging and never appear in the ledger.
            MoveType::StatusUpdate => {}
        }
    }
    edits
}

/// Move type of the direct edit a change originated from: the change's own
/// edit for direct rows, the root edit's for cascaded rows.
fn originating_move_type(
    change: &FieldChange,
    direct_edits: &BTreeMap<ActivityId, DirectEdit>,
    fallback: DirectEdit,
) -> MoveType {
    let by_activity = if change.is_direct_edit {
        direct_edits.get(&change.activity_id)
    } else {
        change
            .source_activity_id
            .and_then(|source| direct_edits.get(&source))
    };
    by_activity.map(DirectEdit::move_type).unwrap_or_else(|| fallback.move_type())
}
