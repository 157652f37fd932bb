//! Core domain logic for SmartDay.
//! This crate owns the task/event/preference state and its business rules.

pub mod clock;
pub mod logging;
pub mod model;
pub mod scheduler;
pub mod selectors;
pub mod storage;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{CalendarEvent, EventDraft, EventId, EventPatch, EventType, RecurrencePattern};
pub use model::preferences::{
    NotificationPreferences, PreferencesPatch, Theme, UserPreferences, WorkingHours,
};
pub use model::state::AppState;
pub use model::task::{
    BestTimeToDo, Task, TaskCategory, TaskDraft, TaskId, TaskPatch, TaskPriority, TaskStatus,
};
pub use model::validation::ValidationError;
pub use selectors::{TaskFilter, WorkloadMetrics};
pub use storage::{MemoryStateStorage, SqliteStateStorage, StateStorage, StorageError, StorageResult};
pub use store::{
    AppStore, DeleteMode, PersistedState, CORRUPT_BACKUP_KEY, ReorderMode, StoreError, StoreResult, SCHEMA_VERSION,
    STORAGE_KEY,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
