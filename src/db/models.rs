//! Shared data models re-exported for database layer consumers, plus the
//! insert- and update-forms the repository traits accept.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use crate::api::{
    ActivityId, ActivitySnapshot, ActivityStatus, CalendarDay, ChangeRecord, ChangedField,
    DateRange, DependencyEdge, FieldValue, MoveType, PublishEvent, PublishEventId, ScheduleId,
    ScheduleInfo, StagedChange, UserId,
};

/// Insert form of a staging ledger row; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStagedChange {
    pub user_id: UserId,
    pub schedule_id: ScheduleId,
    pub activity_id: ActivityId,
    pub move_type: MoveType,
    pub field: ChangedField,
    pub original_value: Option<FieldValue>,
    pub staged_value: FieldValue,
    pub is_direct_edit: bool,
    pub source_activity_id: Option<ActivityId>,
}

/// Insert form of a publish event; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPublishEvent {
    pub user_id: UserId,
    pub schedule_id: ScheduleId,
    pub note: String,
    pub move_types: Vec<MoveType>,
    pub change_count: usize,
    pub direct_edit_count: usize,
    pub cascaded_count: usize,
    pub published_at: DateTime<Utc>,
}

/// Insert form of an audit change record; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChangeRecord {
    pub publish_event_id: PublishEventId,
    pub activity_id: ActivityId,
    pub schedule_id: ScheduleId,
    pub field: ChangedField,
    pub old_value: Option<FieldValue>,
    pub new_value: FieldValue,
    pub is_direct_edit: bool,
    pub source_activity_id: Option<ActivityId>,
    pub changed_at: DateTime<Utc>,
}

/// Merged per-activity field update applied on publish (or by a status
/// transition). `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFieldUpdate {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<i64>,
    pub status: Option<ActivityStatus>,
    pub modified_by: Option<UserId>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl ActivityFieldUpdate {
    /// Whether the update carries at least one schedule field.
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.duration.is_none()
            && self.status.is_none()
    }
}

/// One activity of a schedule being stored, keyed by a caller-chosen
/// schedule-local id. The store maps seed ids to globally unique activity
/// ids and rewrites dependency references accordingly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySeed {
    pub id: ActivityId,
    pub description: String,
    #[serde(default = "default_status")]
    pub status: ActivityStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<i64>,
}

fn default_status() -> ActivityStatus {
    ActivityStatus::NotStarted
}

/// Insert form of a complete schedule: activities, dependency edges between
/// them (by seed id), and the calendar days its horizon needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    pub name: String,
    pub activities: Vec<ActivitySeed>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default)]
    pub calendar_days: Vec<CalendarDay>,
}
