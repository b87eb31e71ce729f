//! In-memory repository implementation.
//!
//! Backs the repository traits with plain maps behind a `parking_lot`
//! RwLock. Used for unit testing and local development; data lives only as
//! long as the process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::api::{
    ActivityId, ActivitySnapshot, CalendarDay, ChangeRecord, DateRange, DependencyEdge,
    PublishEvent, PublishEventId, ScheduleId, ScheduleInfo, StagedChange, UserId,
};
use crate::db::models::{
    ActivityFieldUpdate, NewChangeRecord, NewPublishEvent, NewSchedule, NewStagedChange,
};
use crate::db::repository::{
    AuditRepository, ErrorContext, RepositoryError, RepositoryResult, ScheduleRepository,
    StagingRepository,
};

#[derive(Debug, Clone)]
struct ActivityRecord {
    snapshot: ActivitySnapshot,
    last_modified_by: Option<UserId>,
    last_modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct ScheduleRecord {
    id: ScheduleId,
    name: String,
    activity_ids: Vec<ActivityId>,
}

#[derive(Default)]
struct Store {
    schedules: BTreeMap<ScheduleId, ScheduleRecord>,
    activities: BTreeMap<ActivityId, ActivityRecord>,
    dependencies: BTreeMap<ScheduleId, Vec<DependencyEdge>>,
    calendar_days: BTreeMap<chrono::NaiveDate, CalendarDay>,
    staged: Vec<StagedChange>,
    publish_events: Vec<PublishEvent>,
    change_records: Vec<ChangeRecord>,
    next_schedule_id: i64,
    next_activity_id: i64,
    next_staged_id: i64,
    next_event_id: i64,
    next_record_id: i64,
}

/// In-memory record store.
pub struct LocalRepository {
    store: RwLock<Store>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }

    /// Who last modified an activity, and when. `None` until the first
    /// publish or status transition touches it.
    pub fn last_modified(&self, activity_id: ActivityId) -> Option<(UserId, DateTime<Utc>)> {
        let store = self.store.read();
        let record = store.activities.get(&activity_id)?;
        match (record.last_modified_by, record.last_modified_at) {
            (Some(user), Some(at)) => Some((user, at)),
            _ => None,
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleRepository for LocalRepository {
    async fn store_schedule(&self, schedule: NewSchedule) -> RepositoryResult<ScheduleInfo> {
        if schedule.name.trim().is_empty() {
            return Err(RepositoryError::validation_with_context(
                "Schedule name must not be empty",
                ErrorContext::new("store_schedule").with_entity("schedule"),
            ));
        }

        let mut seen: HashSet<ActivityId> = HashSet::new();
        for seed in &schedule.activities {
            if !seen.insert(seed.id) {
                return Err(RepositoryError::validation_with_context(
                    format!("Duplicate activity id {} in schedule", seed.id),
                    ErrorContext::new("store_schedule").with_entity_id(seed.id),
                ));
            }
            if let Some(duration) = seed.duration {
                if duration < 1 {
                    return Err(RepositoryError::validation_with_context(
                        format!("Activity {} has non-positive duration", seed.id),
                        ErrorContext::new("store_schedule").with_entity_id(seed.id),
                    ));
                }
            }
        }
        for dep in &schedule.dependencies {
            if !seen.contains(&dep.predecessor_id) || !seen.contains(&dep.successor_id) {
                return Err(RepositoryError::validation_with_context(
                    format!(
                        "Dependency {} -> {} references an unknown activity",
                        dep.predecessor_id, dep.successor_id
                    ),
                    ErrorContext::new("store_schedule").with_entity("dependency"),
                ));
            }
        }

        let mut store = self.store.write();

        store.next_schedule_id += 1;
        let schedule_id = ScheduleId::new(store.next_schedule_id);

        // Seed ids are schedule-local; map them onto the global id space.
        let mut id_map: HashMap<ActivityId, ActivityId> = HashMap::new();
        let mut activity_ids = Vec::with_capacity(schedule.activities.len());
        for seed in schedule.activities {
            store.next_activity_id += 1;
            let id = ActivityId::new(store.next_activity_id);
            id_map.insert(seed.id, id);
            activity_ids.push(id);
            store.activities.insert(
                id,
                ActivityRecord {
                    snapshot: ActivitySnapshot {
                        id,
                        schedule_id,
                        description: seed.description,
                        status: seed.status,
                        start_date: seed.start_date,
                        end_date: seed.end_date,
                        duration: seed.duration,
                    },
                    last_modified_by: None,
                    last_modified_at: None,
                },
            );
        }

        let edges: Vec<DependencyEdge> = schedule
            .dependencies
            .into_iter()
            .map(|dep| DependencyEdge {
                predecessor_id: id_map[&dep.predecessor_id],
                successor_id: id_map[&dep.successor_id],
                dependency_type: dep.dependency_type,
                lag_days: dep.lag_days,
            })
            .collect();
        store.dependencies.insert(schedule_id, edges);

        for day in schedule.calendar_days {
            store.calendar_days.insert(day.date, day);
        }

        let activity_count = activity_ids.len();
        store.schedules.insert(
            schedule_id,
            ScheduleRecord {
                id: schedule_id,
                name: schedule.name.clone(),
                activity_ids,
            },
        );

        log::debug!(
            "stored schedule {} ({} activities)",
            schedule_id,
            activity_count
        );

        Ok(ScheduleInfo {
            schedule_id,
            schedule_name: schedule.name,
            activity_count,
        })
    }

    async fn list_schedules(&self) -> RepositoryResult<Vec<ScheduleInfo>> {
        let store = self.store.read();
        Ok(store
            .schedules
            .values()
            .map(|s| ScheduleInfo {
                schedule_id: s.id,
                schedule_name: s.name.clone(),
                activity_count: s.activity_ids.len(),
            })
            .collect())
    }

    async fn fetch_activities(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<ActivitySnapshot>> {
        let store = self.store.read();
        let schedule = store.schedules.get(&schedule_id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Schedule {} not found", schedule_id),
                ErrorContext::new("fetch_activities").with_entity_id(schedule_id),
            )
        })?;

        Ok(schedule
            .activity_ids
            .iter()
            .filter_map(|id| store.activities.get(id))
            .map(|record| record.snapshot.clone())
            .collect())
    }

    async fn fetch_activity(
        &self,
        activity_id: ActivityId,
    ) -> RepositoryResult<Option<ActivitySnapshot>> {
        let store = self.store.read();
        Ok(store
            .activities
            .get(&activity_id)
            .map(|record| record.snapshot.clone()))
    }

    async fn fetch_dependencies(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<DependencyEdge>> {
        let store = self.store.read();
        Ok(store
            .dependencies
            .get(&schedule_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_calendar_days(
        &self,
        range: Option<DateRange>,
    ) -> RepositoryResult<Vec<CalendarDay>> {
        let store = self.store.read();
        Ok(store
            .calendar_days
            .values()
            .filter(|day| range.map(|r| r.contains(day.date)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update_activity_fields(
        &self,
        activity_id: ActivityId,
        update: &ActivityFieldUpdate,
    ) -> RepositoryResult<()> {
        let mut store = self.store.write();
        let record = store.activities.get_mut(&activity_id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Activity {} not found", activity_id),
                ErrorContext::new("update_activity_fields").with_entity_id(activity_id),
            )
        })?;

        if let Some(start) = update.start_date {
            record.snapshot.start_date = Some(start);
        }
        if let Some(end) = update.end_date {
            record.snapshot.end_date = Some(end);
        }
        if let Some(duration) = update.duration {
            record.snapshot.duration = Some(duration);
        }
        if let Some(status) = update.status {
            record.snapshot.status = status;
        }
        if update.modified_by.is_some() {
            record.last_modified_by = update.modified_by;
        }
        if update.modified_at.is_some() {
            record.last_modified_at = update.modified_at;
        }
        Ok(())
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl StagingRepository for LocalRepository {
    async fn fetch_staged(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<StagedChange>> {
        let store = self.store.read();
        Ok(store
            .staged
            .iter()
            .filter(|row| row.user_id == user_id && row.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn insert_staged(&self, rows: Vec<NewStagedChange>) -> RepositoryResult<usize> {
        let mut store = self.store.write();
        let now = Utc::now();
        let count = rows.len();
        for row in rows {
            store.next_staged_id += 1;
            let id = store.next_staged_id;
            store.staged.push(StagedChange {
                id,
                user_id: row.user_id,
                schedule_id: row.schedule_id,
                activity_id: row.activity_id,
                move_type: row.move_type,
                field: row.field,
                original_value: row.original_value,
                staged_value: row.staged_value,
                is_direct_edit: row.is_direct_edit,
                source_activity_id: row.source_activity_id,
                created_at: now,
            });
        }
        Ok(count)
    }

    async fn delete_staged(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<usize> {
        let mut store = self.store.write();
        let before = store.staged.len();
        store
            .staged
            .retain(|row| !(row.user_id == user_id && row.schedule_id == schedule_id));
        Ok(before - store.staged.len())
    }
}

#[async_trait]
impl AuditRepository for LocalRepository {
    async fn insert_publish_event(
        &self,
        event: NewPublishEvent,
    ) -> RepositoryResult<PublishEvent> {
        let mut store = self.store.write();
        store.next_event_id += 1;
        let stored = PublishEvent {
            id: PublishEventId::new(store.next_event_id),
            user_id: event.user_id,
            schedule_id: event.schedule_id,
            note: event.note,
            move_types: event.move_types,
            change_count: event.change_count,
            direct_edit_count: event.direct_edit_count,
            cascaded_count: event.cascaded_count,
            published_at: event.published_at,
        };
        store.publish_events.push(stored.clone());
        Ok(stored)
    }

    async fn insert_change_records(
        &self,
        records: Vec<NewChangeRecord>,
    ) -> RepositoryResult<usize> {
        let mut store = self.store.write();
        let count = records.len();
        for record in records {
            store.next_record_id += 1;
            let id = store.next_record_id;
            store.change_records.push(ChangeRecord {
                id,
                publish_event_id: record.publish_event_id,
                activity_id: record.activity_id,
                schedule_id: record.schedule_id,
                field: record.field,
                old_value: record.old_value,
                new_value: record.new_value,
                is_direct_edit: record.is_direct_edit,
                source_activity_id: record.source_activity_id,
                changed_at: record.changed_at,
            });
        }
        Ok(count)
    }

    async fn fetch_publish_event(
        &self,
        event_id: PublishEventId,
    ) -> RepositoryResult<Option<PublishEvent>> {
        let store = self.store.read();
        Ok(store
            .publish_events
            .iter()
            .find(|event| event.id == event_id)
            .cloned())
    }

    async fn fetch_publish_events(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<PublishEvent>> {
        let store = self.store.read();
        let mut events: Vec<PublishEvent> = store
            .publish_events
            .iter()
            .filter(|event| event.schedule_id == schedule_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.id.value().cmp(&a.id.value()))
        });
        Ok(events)
    }

    async fn fetch_change_records_for_event(
        &self,
        event_id: PublishEventId,
    ) -> RepositoryResult<Vec<ChangeRecord>> {
        let store = self.store.read();
        Ok(store
            .change_records
            .iter()
            .filter(|record| record.publish_event_id == event_id)
            .cloned()
            .collect())
    }

    async fn fetch_change_records_for_activity(
        &self,
        activity_id: ActivityId,
    ) -> RepositoryResult<Vec<ChangeRecord>> {
        let store = self.store.read();
        let mut records: Vec<ChangeRecord> = store
            .change_records
            .iter()
            .filter(|record| record.activity_id == activity_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.changed_at.cmp(&a.changed_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}
