//! Public API surface for the Rust backend.
//!
//! This file consolidates the data model shared by the engine, the repository
//! layer, and the HTTP API. All types derive Serialize/Deserialize for JSON
//! serialization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use crate::models::cascade::{DirectEdit, FieldChange};

/// Schedule identifier (record-store primary key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ScheduleId(pub i64);

/// Activity identifier (one schedule line item).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ActivityId(pub i64);

/// Publish event identifier (audit trail head record).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PublishEventId(pub i64);

/// User identifier. Sessions are resolved upstream; callers hand the backend
/// an already-authenticated user id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl ScheduleId {
    pub fn new(value: i64) -> Self {
        ScheduleId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl ActivityId {
    pub fn new(value: i64) -> Self {
        ActivityId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl PublishEventId {
    pub fn new(value: i64) -> Self {
        PublishEventId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl UserId {
    pub fn new(value: uuid::Uuid) -> Self {
        UserId(value)
    }

    pub fn value(&self) -> uuid::Uuid {
        self.0
    }

    /// Fresh random user id, mainly for tests and local seeding.
    pub fn random() -> Self {
        UserId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for PublishEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ScheduleId> for i64 {
    fn from(id: ScheduleId) -> Self {
        id.0
    }
}
impl From<ActivityId> for i64 {
    fn from(id: ActivityId) -> Self {
        id.0
    }
}

/// The kind of edit a staged or published change originated from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    /// Move an activity's start date (end follows, duration fixed).
    MoveStart,
    /// Change an activity's workday duration (start fixed, end follows).
    ChangeDuration,
    /// Immediate status transition, outside the staging flow.
    StatusUpdate,
}

impl MoveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveType::MoveStart => "move_start",
            MoveType::ChangeDuration => "change_duration",
            MoveType::StatusUpdate => "status_update",
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move_start" => Ok(MoveType::MoveStart),
            "change_duration" => Ok(MoveType::ChangeDuration),
            "status_update" => Ok(MoveType::StatusUpdate),
            other => Err(format!("Unknown move type: {}", other)),
        }
    }
}

/// Dependency edge type.
///
/// FS: successor cannot start until the predecessor finishes (plus lag).
/// SS: successor cannot start until the predecessor starts (plus lag).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyType {
    #[serde(rename = "FS")]
    FinishStart,
    #[serde(rename = "SS")]
    StartStart,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyType::FinishStart => f.write_str("FS"),
            DependencyType::StartStart => f.write_str("SS"),
        }
    }
}

/// The activity field a change applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    StartDate,
    EndDate,
    Duration,
    Status,
}

impl ChangedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedField::StartDate => "start_date",
            ChangedField::EndDate => "end_date",
            ChangedField::Duration => "duration",
            ChangedField::Status => "status",
        }
    }
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity workflow status. `Approved` is terminal: once approved, no
/// further status transition is accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Approved")]
    Approved,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::NotStarted => "Not Started",
            ActivityStatus::InProgress => "In Progress",
            ActivityStatus::Completed => "Completed",
            ActivityStatus::Approved => "Approved",
        }
    }

    /// Terminal statuses block any further status transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActivityStatus::Approved)
    }

    /// Statuses a user may transition an activity into directly.
    pub fn is_valid_transition_target(&self) -> bool {
        matches!(self, ActivityStatus::Completed | ActivityStatus::Approved)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Not Started" => Ok(ActivityStatus::NotStarted),
            "In Progress" => Ok(ActivityStatus::InProgress),
            "Completed" => Ok(ActivityStatus::Completed),
            "Approved" => Ok(ActivityStatus::Approved),
            other => Err(format!("Unknown activity status: {}", other)),
        }
    }
}

/// Typed before/after value of a changed field.
///
/// Serializes untagged: dates as `"YYYY-MM-DD"` strings, durations as
/// integers, statuses as their display strings.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Date(NaiveDate),
    Days(i64),
    Status(ActivityStatus),
}

impl FieldValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_days(&self) -> Option<i64> {
        match self {
            FieldValue::Days(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<ActivityStatus> {
        match self {
            FieldValue::Status(s) => Some(*s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Days(n) => write!(f, "{}", n),
            FieldValue::Status(s) => write!(f, "{}", s),
        }
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Days(n)
    }
}

impl From<ActivityStatus> for FieldValue {
    fn from(s: ActivityStatus) -> Self {
        FieldValue::Status(s)
    }
}

/// One day of the workday calendar. Immutable reference data; dates are
/// unique within the loaded horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_workday: bool,
    /// Optional label, e.g. a holiday name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Inclusive date range, used to bound calendar loads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Live (already-published) state of one schedule line item.
///
/// Owned by the record store; the engine treats it as a read-only input per
/// computation. Activities missing any of start/end/duration are excluded
/// from cascading entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub id: ActivityId,
    pub schedule_id: ScheduleId,
    pub description: String,
    pub status: ActivityStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<i64>,
}

impl ActivitySnapshot {
    /// Whether this activity participates in cascade evaluation.
    pub fn is_schedulable(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some() && self.duration.is_some()
    }
}

/// Directed dependency edge between two activities of the same schedule.
///
/// `lag_days` may be negative (lead) or zero. The data model does not forbid
/// cycles; the engine rejects them at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub predecessor_id: ActivityId,
    pub successor_id: ActivityId,
    pub dependency_type: DependencyType,
    pub lag_days: i64,
}

/// One row of the staging ledger: a proposed, not-yet-committed field change
/// for a (user, schedule) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedChange {
    pub id: i64,
    pub user_id: UserId,
    pub schedule_id: ScheduleId,
    pub activity_id: ActivityId,
    /// Move type of the direct edit this row originated from.
    pub move_type: MoveType,
    pub field: ChangedField,
    pub original_value: Option<FieldValue>,
    pub staged_value: FieldValue,
    pub is_direct_edit: bool,
    pub source_activity_id: Option<ActivityId>,
    pub created_at: DateTime<Utc>,
}

/// Audit trail head record: one publish action by one user on one schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishEvent {
    pub id: PublishEventId,
    pub user_id: UserId,
    pub schedule_id: ScheduleId,
    pub note: String,
    /// Distinct move types among the published changes.
    pub move_types: Vec<MoveType>,
    pub change_count: usize,
    pub direct_edit_count: usize,
    pub cascaded_count: usize,
    pub published_at: DateTime<Utc>,
}

/// Audit trail detail record: one committed field change, always belonging
/// to exactly one publish event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: i64,
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

/// Lightweight schedule listing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInfo {
    pub schedule_id: ScheduleId,
    pub schedule_name: String,
    pub activity_count: usize,
}
