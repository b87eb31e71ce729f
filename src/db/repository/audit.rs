//! Audit repository trait for the append-only publish trail.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::db::models::{
    ActivityId, ChangeRecord, NewChangeRecord, NewPublishEvent, PublishEvent, PublishEventId,
    ScheduleId,
};

/// Repository trait for the publish audit trail.
///
/// Publish events and change records are append-only; nothing in the core
/// ever updates or deletes them. When live-record updates partially fail,
/// this trail is the source of truth for what was committed.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append one publish event, returning it with its assigned id.
    async fn insert_publish_event(
        &self,
        event: NewPublishEvent,
    ) -> RepositoryResult<PublishEvent>;

    /// Append the change records of a publish event.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records appended
    async fn insert_change_records(&self, records: Vec<NewChangeRecord>)
        -> RepositoryResult<usize>;

    /// Fetch one publish event by id, `None` if absent.
    async fn fetch_publish_event(
        &self,
        event_id: PublishEventId,
    ) -> RepositoryResult<Option<PublishEvent>>;

    /// Fetch the publish events of a schedule, newest first.
    async fn fetch_publish_events(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<PublishEvent>>;

    /// Fetch the change records belonging to one publish event, in
    /// insertion order.
    async fn fetch_change_records_for_event(
        &self,
        event_id: PublishEventId,
    ) -> RepositoryResult<Vec<ChangeRecord>>;

    /// Fetch the change records affecting one activity, newest first.
    async fn fetch_change_records_for_activity(
        &self,
        activity_id: ActivityId,
    ) -> RepositoryResult<Vec<ChangeRecord>>;
}
