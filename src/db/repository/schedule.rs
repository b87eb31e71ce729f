//! Schedule repository trait for live schedule data.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::db::models::{
    ActivityFieldUpdate, ActivityId, ActivitySnapshot, CalendarDay, DateRange, DependencyEdge,
    NewSchedule, ScheduleId, ScheduleInfo,
};

/// Repository trait for live (published) schedule records.
///
/// The scheduling core reads snapshots through this trait and writes merged
/// field updates back on publish. It never mutates snapshots in place.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Store a complete schedule, assigning fresh ids.
    ///
    /// Seed activity ids are schedule-local; the store maps them to globally
    /// unique ids, rewrites dependency references, and merges the supplied
    /// calendar days into the shared calendar.
    ///
    /// # Returns
    /// * `Ok(ScheduleInfo)` - Listing row of the stored schedule
    /// * `Err(RepositoryError)` - Validation failure or storage error
    async fn store_schedule(&self, schedule: NewSchedule) -> RepositoryResult<ScheduleInfo>;

    /// List all stored schedules.
    async fn list_schedules(&self) -> RepositoryResult<Vec<ScheduleInfo>>;

    /// Fetch the live activity snapshots of one schedule.
    ///
    /// # Returns
    /// * `Ok(Vec<ActivitySnapshot>)` - All activities, schedulable or not
    /// * `Err(RepositoryError)` - NotFound if the schedule is unknown
    async fn fetch_activities(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<ActivitySnapshot>>;

    /// Fetch one activity snapshot by id, `None` if absent.
    async fn fetch_activity(
        &self,
        activity_id: ActivityId,
    ) -> RepositoryResult<Option<ActivitySnapshot>>;

    /// Fetch the dependency edges of one schedule.
    async fn fetch_dependencies(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<DependencyEdge>>;

    /// Fetch calendar days, optionally bounded to a range. `None` returns
    /// the full loaded horizon, ordered by date.
    async fn fetch_calendar_days(
        &self,
        range: Option<DateRange>,
    ) -> RepositoryResult<Vec<CalendarDay>>;

    /// Apply a merged field update to one live activity record.
    ///
    /// # Returns
    /// * `Ok(())` - Update applied
    /// * `Err(RepositoryError)` - NotFound if the activity is unknown
    async fn update_activity_fields(
        &self,
        activity_id: ActivityId,
        update: &ActivityFieldUpdate,
    ) -> RepositoryResult<()>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;
}
