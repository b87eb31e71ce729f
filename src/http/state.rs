//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::{PublishService, StageLocks, StagingService, StatusService};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for record-store operations
    pub repository: Arc<dyn FullRepository>,
    /// Staging ledger operations
    pub staging: Arc<StagingService>,
    /// Publish transaction operations
    pub publish: Arc<PublishService>,
    /// Immediate status transitions
    pub status: Arc<StatusService>,
}

impl AppState {
    /// Create a new application state with the given repository.
    ///
    /// The staging and publish services share one lock registry so that
    /// staging and publishing on the same (user, schedule) key serialize.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        let locks = Arc::new(StageLocks::new());
        Self {
            staging: Arc::new(StagingService::new(repository.clone(), locks.clone())),
            publish: Arc::new(PublishService::new(repository.clone(), locks)),
            status: Arc::new(StatusService::new(repository.clone())),
            repository,
        }
    }
}
