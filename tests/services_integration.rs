//! End-to-end integration tests: stage, review, publish, and status flows
//! over the in-memory repository.

mod support;

use std::sync::Arc;

use csi_rust::api::{ActivityStatus, ChangedField, FieldValue, MoveType, UserId};
use csi_rust::db::models::NewSchedule;
use csi_rust::db::repositories::LocalRepository;
use csi_rust::db::repository::{AuditRepository, FullRepository, ScheduleRepository};
use csi_rust::models::cascade::DirectEdit;
use csi_rust::services::{
    PublishService, StageLocks, StagingService, StatusService,
};

use support::{date, fs, seed, seed_chain_schedule, ss, workweek_days};

fn build_services(
    repo: Arc<LocalRepository>,
) -> (StagingService, PublishService, StatusService) {
    let repo = repo as Arc<dyn FullRepository>;
    let locks = Arc::new(StageLocks::new());
    (
        StagingService::new(repo.clone(), locks.clone()),
        PublishService::new(repo.clone(), locks),
        StatusService::new(repo),
    )
}

#[tokio::test]
async fn test_stage_review_publish_round_trip() {
    let (repo, schedule_id, ids) = seed_chain_schedule().await;
    let (staging, publish, _status) = build_services(repo.clone());
    let user = UserId::random();

    // Move the chain head one workday later; the whole chain shifts.
    let outcome = staging
        .stage(
            user,
            schedule_id,
            ids[0],
            DirectEdit::MoveStart(date("2026-01-06")),
        )
        .await
        .unwrap();
    assert_eq!(outcome.direct_count, 2);
    // B and C each move start and end.
    assert_eq!(outcome.cascaded_count, 4);

    // Review: rows are grouped by activity and field.
    let rows = staging.staged_changes(user, schedule_id).await.unwrap();
    assert_eq!(rows.len(), 6);
    let c_start = rows
        .iter()
        .find(|r| r.activity_id == ids[2] && r.field == ChangedField::StartDate)
        .expect("C start row");
    // C lands on Wednesday the 14th, attributed to the root edit on A.
    assert_eq!(c_start.staged_value, FieldValue::Date(date("2026-01-14")));
    assert_eq!(c_start.source_activity_id, Some(ids[0]));

    // Publish and verify live state.
    let outcome = publish
        .publish(user, schedule_id, "Shift site preparation")
        .await
        .unwrap();
    assert!(outcome.is_success());

    let c = repo.fetch_activity(ids[2]).await.unwrap().unwrap();
    assert_eq!(c.start_date, Some(date("2026-01-14")));
    assert_eq!(c.end_date, Some(date("2026-01-16")));
    // Cascade never touches durations.
    assert_eq!(c.duration, Some(3));

    // History surfaces the event and its records.
    let events = repo.fetch_publish_events(schedule_id).await.unwrap();
    assert_eq!(events.len(), 1);
    let records = repo
        .fetch_change_records_for_event(events[0].id)
        .await
        .unwrap();
    assert_eq!(records.len(), 6);
    let c_records = repo
        .fetch_change_records_for_activity(ids[2])
        .await
        .unwrap();
    assert_eq!(c_records.len(), 2);
}

#[tokio::test]
async fn test_publishing_twice_requires_restaging() {
    let (repo, schedule_id, ids) = seed_chain_schedule().await;
    let (staging, publish, _status) = build_services(repo.clone());
    let user = UserId::random();

    staging
        .stage(user, schedule_id, ids[0], DirectEdit::ChangeDuration(5))
        .await
        .unwrap();
    publish
        .publish(user, schedule_id, "Extend excavation")
        .await
        .unwrap();

    // The ledger was consumed; publishing again is a validation error.
    let result = publish.publish(user, schedule_id, "Again").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_two_predecessors_latest_wins_end_to_end() {
    let repo = Arc::new(LocalRepository::new());
    let info = repo
        .store_schedule(NewSchedule {
            name: "Convergent trades".to_string(),
            activities: vec![
                seed(1, "2026-01-05", "2026-01-09", 5),
                seed(2, "2026-01-05", "2026-01-06", 2),
                seed(3, "2026-01-12", "2026-01-13", 2),
            ],
            dependencies: vec![fs(1, 3, 0), ss(2, 3, 2)],
            calendar_days: workweek_days(),
        })
        .await
        .unwrap();
    let ids: Vec<_> = repo
        .fetch_activities(info.schedule_id)
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();

    let (staging, _publish, _status) = build_services(repo.clone());
    let user = UserId::random();

    let outcome = staging
        .stage(
            user,
            info.schedule_id,
            ids[0],
            DirectEdit::MoveStart(date("2026-01-12")),
        )
        .await
        .unwrap();

    // FS from the moved predecessor gives Monday the 19th; the untouched SS
    // edge gives the 7th. Latest wins and traces to the direct edit.
    let c_start = outcome
        .changes
        .iter()
        .find(|c| c.activity_id == ids[2] && c.field == ChangedField::StartDate)
        .expect("C start change");
    assert_eq!(c_start.new_value, FieldValue::Date(date("2026-01-19")));
    assert_eq!(c_start.source_activity_id, Some(ids[0]));
}

#[tokio::test]
async fn test_status_transition_round_trip() {
    let (repo, schedule_id, ids) = seed_chain_schedule().await;
    let (_staging, _publish, status) = build_services(repo.clone());
    let user = UserId::random();

    let receipt = status
        .set_status(user, ids[0], schedule_id, ActivityStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(receipt.old_status, ActivityStatus::NotStarted);
    assert_eq!(receipt.new_status, ActivityStatus::Completed);

    let events = repo.fetch_publish_events(schedule_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].move_types, vec![MoveType::StatusUpdate]);

    // Approve, then verify the terminal guard end to end.
    status
        .set_status(user, ids[0], schedule_id, ActivityStatus::Approved, None)
        .await
        .unwrap();
    let result = status
        .set_status(user, ids[0], schedule_id, ActivityStatus::Completed, None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_independent_users_do_not_interfere() {
    let (repo, schedule_id, ids) = seed_chain_schedule().await;
    let repo_dyn = repo.clone() as Arc<dyn FullRepository>;
    let locks = Arc::new(StageLocks::new());
    let staging = Arc::new(StagingService::new(repo_dyn.clone(), locks.clone()));
    let alice = UserId::random();
    let bob = UserId::random();
    let head = ids[0];

    // Concurrent staging on different keys proceeds independently.
    let a = {
        let staging = staging.clone();
        let edit = DirectEdit::MoveStart(date("2026-01-06"));
        tokio::spawn(async move { staging.stage(alice, schedule_id, head, edit).await })
    };
    let b = {
        let staging = staging.clone();
        let edit = DirectEdit::ChangeDuration(5);
        tokio::spawn(async move { staging.stage(bob, schedule_id, head, edit).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let alice_rows = staging.staged_changes(alice, schedule_id).await.unwrap();
    let bob_rows = staging.staged_changes(bob, schedule_id).await.unwrap();
    assert!(alice_rows.iter().all(|r| r.user_id == alice));
    assert!(bob_rows.iter().all(|r| r.user_id == bob));
    assert!(bob_rows
        .iter()
        .any(|r| r.field == ChangedField::Duration));
}
