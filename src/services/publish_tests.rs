//! Tests for the publish transaction against the in-memory repository.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use std::sync::Arc;

use crate::api::{
    ActivityId, ActivitySnapshot, ActivityStatus, CalendarDay, ChangeRecord, DateRange,
    DependencyEdge, DependencyType, MoveType, PublishEvent, PublishEventId, ScheduleId,
    ScheduleInfo, StagedChange, UserId,
};
use crate::db::models::{
    ActivityFieldUpdate, ActivitySeed, NewChangeRecord, NewPublishEvent, NewSchedule,
    NewStagedChange,
};
use crate::db::repositories::LocalRepository;
use crate::db::repository::{
    AuditRepository, FullRepository, RepositoryError, RepositoryResult, ScheduleRepository,
    StagingRepository,
};
use crate::models::cascade::DirectEdit;
use crate::services::error::ServiceError;
use crate::services::publish::{PublishOutcome, PublishService};
use crate::services::staging::{StageLocks, StagingService};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

fn workweek_days() -> Vec<CalendarDay> {
    let mut days = Vec::new();
    let mut current = date("2026-01-01");
    let end = date("2026-03-31");
    while current <= end {
        days.push(CalendarDay {
            date: current,
            is_workday: !matches!(current.weekday(), Weekday::Sat | Weekday::Sun),
            description: None,
        });
        current = current.succ_opt().unwrap();
    }
    days
}

fn seed(id: i64, start: &str, end: &str, duration: i64) -> ActivitySeed {
    ActivitySeed {
        id: ActivityId::new(id),
        description: format!("Activity {}", id),
        status: ActivityStatus::NotStarted,
        start_date: Some(date(start)),
        end_date: Some(date(end)),
        duration: Some(duration),
    }
}

async fn seed_repo() -> (Arc<LocalRepository>, ScheduleId, Vec<ActivityId>) {
    let repo = Arc::new(LocalRepository::new());
    let info = repo
        .store_schedule(NewSchedule {
            name: "Structural works".to_string(),
            activities: vec![
                seed(1, "2026-01-05", "2026-01-08", 4),
                seed(2, "2026-01-09", "2026-01-12", 2),
                seed(3, "2026-02-02", "2026-02-03", 2),
            ],
            dependencies: vec![DependencyEdge {
                predecessor_id: ActivityId::new(1),
                successor_id: ActivityId::new(2),
                dependency_type: DependencyType::FinishStart,
                lag_days: 0,
            }],
            calendar_days: workweek_days(),
        })
        .await
        .expect("seed schedule");

    let activities = repo.fetch_activities(info.schedule_id).await.unwrap();
    let ids = activities.iter().map(|a| a.id).collect();
    (repo, info.schedule_id, ids)
}

fn services(repo: Arc<dyn FullRepository>) -> (StagingService, PublishService) {
    let locks = Arc::new(StageLocks::new());
    (
        StagingService::new(repo.clone(), locks.clone()),
        PublishService::new(repo, locks),
    )
}

#[tokio::test]
async fn test_publish_applies_changes_and_writes_audit_trail() {
    let (repo, schedule_id, ids) = seed_repo().await;
    let (staging, publish) = services(repo.clone() as Arc<dyn FullRepository>);
    let user = UserId::random();

    staging
        .stage(
            user,
            schedule_id,
            ids[0],
            DirectEdit::MoveStart(date("2026-01-06")),
        )
        .await
        .unwrap();

    let outcome = publish
        .publish(user, schedule_id, "Shifted foundation start")
        .await
        .unwrap();

    let receipt = outcome.receipt();
    assert!(outcome.is_success());
    assert_eq!(receipt.change_count, 4);
    assert_eq!(receipt.direct_count, 2);
    assert_eq!(receipt.cascaded_count, 2);

    // Live records carry the new dates.
    let a = repo.fetch_activity(ids[0]).await.unwrap().unwrap();
    assert_eq!(a.start_date, Some(date("2026-01-06")));
    assert_eq!(a.end_date, Some(date("2026-01-09")));
    let b = repo.fetch_activity(ids[1]).await.unwrap().unwrap();
    assert_eq!(b.start_date, Some(date("2026-01-12")));

    // The ledger is cleared, and the actor is stamped on the records.
    assert!(repo.fetch_staged(user, schedule_id).await.unwrap().is_empty());
    let (modified_by, _modified_at) = repo.last_modified(ids[0]).expect("modification stamp");
    assert_eq!(modified_by, user);

    // Audit trail: one event, one record per staged row.
    let events = repo.fetch_publish_events(schedule_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].note, "Shifted foundation start");
    assert_eq!(events[0].move_types, vec![MoveType::MoveStart]);
    let records = repo
        .fetch_change_records_for_event(events[0].id)
        .await
        .unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.publish_event_id == events[0].id));
}

#[tokio::test]
async fn test_publish_requires_note() {
    let (repo, schedule_id, ids) = seed_repo().await;
    let (staging, publish) = services(repo.clone() as Arc<dyn FullRepository>);
    let user = UserId::random();

    staging
        .stage(user, schedule_id, ids[2], DirectEdit::ChangeDuration(3))
        .await
        .unwrap();

    let result = publish.publish(user, schedule_id, "   ").await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    // Nothing happened: ledger intact, no events.
    assert!(!repo.fetch_staged(user, schedule_id).await.unwrap().is_empty());
    assert!(repo.fetch_publish_events(schedule_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_with_empty_ledger_fails() {
    let (repo, schedule_id, _ids) = seed_repo().await;
    let (_staging, publish) = services(repo.clone() as Arc<dyn FullRepository>);
    let user = UserId::random();

    let result = publish.publish(user, schedule_id, "Nothing staged").await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
    assert!(repo.fetch_publish_events(schedule_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_collects_distinct_move_types() {
    let (repo, schedule_id, ids) = seed_repo().await;
    let (staging, publish) = services(repo.clone() as Arc<dyn FullRepository>);
    let user = UserId::random();

    staging
        .stage(
            user,
            schedule_id,
            ids[0],
            DirectEdit::MoveStart(date("2026-01-06")),
        )
        .await
        .unwrap();
    staging
        .stage(user, schedule_id, ids[2], DirectEdit::ChangeDuration(4))
        .await
        .unwrap();

    publish
        .publish(user, schedule_id, "Mixed edits")
        .await
        .unwrap();

    let events = repo.fetch_publish_events(schedule_id).await.unwrap();
    assert_eq!(
        events[0].move_types,
        vec![MoveType::MoveStart, MoveType::ChangeDuration]
    );
}

// =========================================================
// Partial failure
// =========================================================

/// Repository wrapper whose `update_activity_fields` fails for one activity.
struct FlakyRepository {
    inner: Arc<LocalRepository>,
    fail_for: ActivityId,
}

#[async_trait]
impl ScheduleRepository for FlakyRepository {
    async fn store_schedule(&self, schedule: NewSchedule) -> RepositoryResult<ScheduleInfo> {
        self.inner.store_schedule(schedule).await
    }

    async fn list_schedules(&self) -> RepositoryResult<Vec<ScheduleInfo>> {
        self.inner.list_schedules().await
    }

    async fn fetch_activities(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<ActivitySnapshot>> {
        self.inner.fetch_activities(schedule_id).await
    }

    async fn fetch_activity(
        &self,
        activity_id: ActivityId,
    ) -> RepositoryResult<Option<ActivitySnapshot>> {
        self.inner.fetch_activity(activity_id).await
    }

    async fn fetch_dependencies(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<DependencyEdge>> {
        self.inner.fetch_dependencies(schedule_id).await
    }

    async fn fetch_calendar_days(
        &self,
        range: Option<DateRange>,
    ) -> RepositoryResult<Vec<CalendarDay>> {
        self.inner.fetch_calendar_days(range).await
    }

    async fn update_activity_fields(
        &self,
        activity_id: ActivityId,
        update: &ActivityFieldUpdate,
    ) -> RepositoryResult<()> {
        if activity_id == self.fail_for {
            return Err(RepositoryError::query("simulated storage failure"));
        }
        self.inner.update_activity_fields(activity_id, update).await
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl StagingRepository for FlakyRepository {
    async fn fetch_staged(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<StagedChange>> {
        self.inner.fetch_staged(user_id, schedule_id).await
    }

    async fn insert_staged(&self, rows: Vec<NewStagedChange>) -> RepositoryResult<usize> {
        self.inner.insert_staged(rows).await
    }

    async fn delete_staged(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<usize> {
        self.inner.delete_staged(user_id, schedule_id).await
    }
}

#[async_trait]
impl AuditRepository for FlakyRepository {
    async fn insert_publish_event(
        &self,
        event: NewPublishEvent,
    ) -> RepositoryResult<PublishEvent> {
        self.inner.insert_publish_event(event).await
    }

    async fn insert_change_records(
        &self,
        records: Vec<NewChangeRecord>,
    ) -> RepositoryResult<usize> {
        self.inner.insert_change_records(records).await
    }

    async fn fetch_publish_event(
        &self,
        event_id: PublishEventId,
    ) -> RepositoryResult<Option<PublishEvent>> {
        self.inner.fetch_publish_event(event_id).await
    }

    async fn fetch_publish_events(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<PublishEvent>> {
        self.inner.fetch_publish_events(schedule_id).await
    }

    async fn fetch_change_records_for_event(
        &self,
        event_id: PublishEventId,
    ) -> RepositoryResult<Vec<ChangeRecord>> {
        self.inner.fetch_change_records_for_event(event_id).await
    }

    async fn fetch_change_records_for_activity(
        &self,
        activity_id: ActivityId,
    ) -> RepositoryResult<Vec<ChangeRecord>> {
        self.inner.fetch_change_records_for_activity(activity_id).await
    }
}

#[tokio::test]
async fn test_publish_reports_partial_failure() {
    let (inner, schedule_id, ids) = seed_repo().await;
    let flaky = Arc::new(FlakyRepository {
        inner: inner.clone(),
        fail_for: ids[1],
    });
    let (staging, publish) = services(flaky as Arc<dyn FullRepository>);
    let user = UserId::random();

    // The edit cascades into ids[1], whose live update will fail.
    staging
        .stage(
            user,
            schedule_id,
            ids[0],
            DirectEdit::MoveStart(date("2026-01-06")),
        )
        .await
        .unwrap();

    let outcome = publish
        .publish(user, schedule_id, "Partial publish")
        .await
        .unwrap();

    let PublishOutcome::PartialFailure { receipt, failures } = outcome else {
        panic!("expected partial failure");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].activity_id, ids[1]);

    // The audit trail is written and the ledger cleared despite the failure.
    let events = inner.fetch_publish_events(schedule_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, receipt.publish_event_id);
    assert_eq!(
        inner
            .fetch_change_records_for_event(events[0].id)
            .await
            .unwrap()
            .len(),
        receipt.change_count
    );
    assert!(inner.fetch_staged(user, schedule_id).await.unwrap().is_empty());

    // The activity that did not fail was updated.
    let a = inner.fetch_activity(ids[0]).await.unwrap().unwrap();
    assert_eq!(a.start_date, Some(date("2026-01-06")));
    // The failing activity kept its live dates.
    let b = inner.fetch_activity(ids[1]).await.unwrap().unwrap();
    assert_eq!(b.start_date, Some(date("2026-01-09")));
}
