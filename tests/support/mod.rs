//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use std::sync::Arc;

use csi_rust::api::{
    ActivityId, ActivityStatus, CalendarDay, DependencyEdge, DependencyType, ScheduleId,
};
use csi_rust::db::models::{ActivitySeed, NewSchedule};
use csi_rust::db::repositories::LocalRepository;
use csi_rust::db::repository::ScheduleRepository;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

/// Mon-Fri workweek over Q1 2026 (2026-01-05 is the first full Monday).
pub fn workweek_days() -> Vec<CalendarDay> {
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

pub fn seed(id: i64, start: &str, end: &str, duration: i64) -> ActivitySeed {
    ActivitySeed {
        id: ActivityId::new(id),
        description: format!("Activity {}", id),
        status: ActivityStatus::NotStarted,
        start_date: Some(date(start)),
        end_date: Some(date(end)),
        duration: Some(duration),
    }
}

pub fn fs(pred: i64, succ: i64, lag: i64) -> DependencyEdge {
    DependencyEdge {
        predecessor_id: ActivityId::new(pred),
        successor_id: ActivityId::new(succ),
        dependency_type: DependencyType::FinishStart,
        lag_days: lag,
    }
}

pub fn ss(pred: i64, succ: i64, lag: i64) -> DependencyEdge {
    DependencyEdge {
        predecessor_id: ActivityId::new(pred),
        successor_id: ActivityId::new(succ),
        dependency_type: DependencyType::StartStart,
        lag_days: lag,
    }
}

/// Store a three-activity chain A -FS0-> B -FS0-> C plus the workweek
/// calendar; returns the repository, schedule id, and global activity ids.
pub async fn seed_chain_schedule() -> (Arc<LocalRepository>, ScheduleId, Vec<ActivityId>) {
    let repo = Arc::new(LocalRepository::new());
    let info = repo
        .store_schedule(NewSchedule {
            name: "Site preparation".to_string(),
            activities: vec![
                seed(1, "2026-01-05", "2026-01-08", 4),
                seed(2, "2026-01-09", "2026-01-12", 2),
                seed(3, "2026-01-13", "2026-01-15", 3),
            ],
            dependencies: vec![fs(1, 2, 0), fs(2, 3, 0)],
            calendar_days: workweek_days(),
        })
        .await
        .expect("seed schedule");

    let activities = repo.fetch_activities(info.schedule_id).await.unwrap();
    let ids = activities.iter().map(|a| a.id).collect();
    (repo, info.schedule_id, ids)
}
