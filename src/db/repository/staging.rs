//! Staging repository trait for the proposed-changes ledger.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::db::models::{NewStagedChange, ScheduleId, StagedChange, UserId};

/// Repository trait for the staging ledger.
///
/// The ledger is a derived, disposable view: the staging service deletes all
/// rows for a (user, schedule) pair and reinserts the freshly computed
/// cascade on every edit. Implementations never patch rows in place.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait StagingRepository: Send + Sync {
    /// Fetch all staged rows for a (user, schedule) pair, in insertion order.
    async fn fetch_staged(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<StagedChange>>;

    /// Insert freshly computed staged rows.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows inserted
    async fn insert_staged(&self, rows: Vec<NewStagedChange>) -> RepositoryResult<usize>;

    /// Delete all staged rows for a (user, schedule) pair.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows deleted (0 when nothing was staged)
    async fn delete_staged(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<usize>;
}
