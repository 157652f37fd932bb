//! Application state store.
//!
//! # Responsibility
//! - Own the single `AppState` and expose its read/write surface.
//! - Assign identity and system timestamps on creation.
//! - Stamp `last_sync` and persist the envelope after every mutation.
//!
//! # Invariants
//! - Task and event ids are unique within their collections.
//! - `updated_at` strictly increases on every task update.
//! - Public operations never panic; not-found is a silent no-op.
//! - Persistence failures are logged and never undo a mutation.

use crate::clock::Clock;
use crate::model::event::{CalendarEvent, EventDraft, EventPatch};
use crate::model::preferences::{PreferencesPatch, UserPreferences};
use crate::model::state::AppState;
use crate::model::task::{
    Task, TaskCategory, TaskDraft, TaskId, TaskPatch, TaskPriority, TaskStatus,
};
use crate::scheduler;
use crate::selectors::{self, TaskFilter, WorkloadMetrics};
use crate::storage::{StateStorage, StorageError};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub mod persist;

pub use persist::{PersistedState, CORRUPT_BACKUP_KEY, SCHEMA_VERSION, STORAGE_KEY};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Storage(StorageError),
    Serialization(serde_json::Error),
    UnsupportedSchemaVersion { version: u64, latest_supported: u64 },
    InvalidPersistedState(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "state serialization failed: {err}"),
            Self::UnsupportedSchemaVersion {
                version,
                latest_supported,
            } => write!(
                f,
                "persisted state version {version} is newer than supported {latest_supported}"
            ),
            Self::InvalidPersistedState(message) => {
                write!(f, "invalid persisted state: {message}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::InvalidPersistedState(_) => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// How `delete_task` removes a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Keep the task and mark it `Cancelled`.
    #[default]
    Soft,
    /// Remove the task from the collection.
    Hard,
}

/// How `reorder_tasks_with` treats tasks not named in the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderMode {
    /// The collection becomes only the listed tasks, in listed order.
    /// Unlisted tasks are dropped.
    #[default]
    ReplaceWithListed,
    /// Listed tasks get their position stamped; every other task stays in
    /// place untouched.
    StampListed,
}

/// Single owner of the application state.
///
/// Construct once at process start and pass by reference to consumers.
pub struct AppStore<S: StateStorage> {
    state: AppState,
    storage: S,
    clock: Box<dyn Clock>,
}

impl<S: StateStorage> AppStore<S> {
    /// Creates an empty store without reading `storage`.
    pub fn new(storage: S, clock: impl Clock + 'static) -> Self {
        let today = clock.now().date_naive();
        Self {
            state: AppState::empty(today),
            storage,
            clock: Box::new(clock),
        }
    }

    /// Creates a store and hydrates it from the persisted envelope, if any.
    ///
    /// An envelope that cannot be decoded is copied to
    /// `CORRUPT_BACKUP_KEY` and the store starts empty; the bad envelope is
    /// replaced on the first mutation.
    ///
    /// # Errors
    /// - Storage read failures.
    /// - Envelopes newer than supported; they are left untouched.
    pub fn open(storage: S, clock: impl Clock + 'static) -> StoreResult<Self> {
        let started_at = Instant::now();
        let mut store = Self::new(storage, clock);
        store.state.is_loading = true;

        let raw = match store.storage.get_item(STORAGE_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                error!(
                    "event=store_load module=store status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };
        let loaded = raw.as_deref().map(persist::decode_state).transpose();

        store.state.is_loading = false;
        match loaded {
            Ok(Some(persisted)) => {
                info!(
                    "event=store_load module=store status=ok tasks={} events={} duration_ms={}",
                    persisted.tasks.len(),
                    persisted.events.len(),
                    started_at.elapsed().as_millis()
                );
                store.state.tasks = persisted.tasks;
                store.state.events = persisted.events;
                store.state.user_preferences = persisted.user_preferences;
                Ok(store)
            }
            Ok(None) => {
                info!("event=store_load module=store status=empty");
                Ok(store)
            }
            Err(err @ StoreError::UnsupportedSchemaVersion { .. }) => {
                error!(
                    "event=store_load module=store status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
            Err(err) => {
                error!(
                    "event=store_load module=store status=recovered duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                if let Some(text) = raw.as_deref() {
                    store.back_up_corrupt_envelope(text);
                }
                Ok(store)
            }
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.state.events
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.state.user_preferences
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == id)
    }

    pub fn event(&self, id: &str) -> Option<&CalendarEvent> {
        self.state.events.iter().find(|event| event.id == id)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.last_sync
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.state.selected_date
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    /// Current instant from the store clock.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Appends a new task with a fresh id and `created_at == updated_at`.
    pub fn add_task(&mut self, draft: TaskDraft) -> Task {
        let task = Task::from_draft(generate_id(), draft, self.clock.now_utc());
        self.state.tasks.push(task.clone());

        debug!("event=task_add module=store status=ok task_id={}", task.id);
        self.commit();
        task
    }

    /// Applies `patch` to the task with `id` and refreshes `updated_at`.
    ///
    /// Returns the updated task, or `None` when no task has that id.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let now = self.clock.now_utc();
        let Some(task) = self.state.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("event=task_update module=store status=noop reason=not_found");
            return None;
        };

        task.apply(patch);
        task.updated_at = next_update_stamp(task.updated_at, now);
        let updated = task.clone();

        debug!("event=task_update module=store status=ok task_id={id}");
        self.commit();
        Some(updated)
    }

    /// Cancels (`Soft`) or removes (`Hard`) a task.
    ///
    /// Returns whether a task with `id` existed.
    pub fn delete_task(&mut self, id: &str, mode: DeleteMode) -> bool {
        match mode {
            DeleteMode::Soft => self
                .update_task(id, TaskPatch::status(TaskStatus::Cancelled))
                .is_some(),
            DeleteMode::Hard => {
                let before = self.state.tasks.len();
                let remaining: Vec<Task> = self
                    .state
                    .tasks
                    .iter()
                    .filter(|task| task.id != id)
                    .cloned()
                    .collect();
                if remaining.len() == before {
                    debug!("event=task_delete module=store status=noop reason=not_found");
                    return false;
                }
                self.state.tasks = remaining;
                debug!("event=task_delete module=store status=ok mode=hard task_id={id}");
                self.commit();
                true
            }
        }
    }

    /// Marks a task `Done`, stamps `completed_at` and records time spent.
    pub fn complete_task(&mut self, id: &str, actual_duration: Option<u32>) -> Option<Task> {
        let mut patch = TaskPatch {
            status: Some(TaskStatus::Done),
            completed_at: Some(Some(self.clock.now_utc())),
            ..TaskPatch::default()
        };
        if let Some(minutes) = actual_duration {
            patch.actual_duration = Some(Some(minutes));
        }
        self.update_task(id, patch)
    }

    /// Flips a task between done and todo.
    ///
    /// Reopening clears `completed_at`; any non-done task is completed.
    pub fn toggle_task(&mut self, id: &str) -> Option<Task> {
        let status = self.task(id)?.status;
        if status == TaskStatus::Done {
            self.update_task(
                id,
                TaskPatch {
                    status: Some(TaskStatus::Todo),
                    completed_at: Some(None),
                    ..TaskPatch::default()
                },
            )
        } else {
            self.complete_task(id, None)
        }
    }

    /// Appends a new event with a fresh id.
    pub fn add_event(&mut self, draft: EventDraft) -> CalendarEvent {
        let event = CalendarEvent::from_draft(generate_id(), draft);
        self.state.events.push(event.clone());

        debug!("event=event_add module=store status=ok event_id={}", event.id);
        self.commit();
        event
    }

    /// Applies `patch` to the event with `id`.
    pub fn update_event(&mut self, id: &str, patch: EventPatch) -> Option<CalendarEvent> {
        let Some(event) = self.state.events.iter_mut().find(|event| event.id == id) else {
            debug!("event=event_update module=store status=noop reason=not_found");
            return None;
        };

        event.apply(patch);
        let updated = event.clone();

        debug!("event=event_update module=store status=ok event_id={id}");
        self.commit();
        Some(updated)
    }

    /// Removes the event with `id`. Linked tasks are left alone.
    pub fn delete_event(&mut self, id: &str) -> bool {
        let before = self.state.events.len();
        let remaining: Vec<CalendarEvent> = self
            .state
            .events
            .iter()
            .filter(|event| event.id != id)
            .cloned()
            .collect();
        if remaining.len() == before {
            debug!("event=event_delete module=store status=noop reason=not_found");
            return false;
        }
        self.state.events = remaining;
        debug!("event=event_delete module=store status=ok event_id={id}");
        self.commit();
        true
    }

    /// Shallow-merges `patch` into the preferences record.
    pub fn update_preferences(&mut self, patch: PreferencesPatch) -> UserPreferences {
        let mut preferences = self.state.user_preferences.clone();
        preferences.merge(patch);
        self.state.user_preferences = preferences.clone();

        debug!("event=preferences_update module=store status=ok");
        self.commit();
        preferences
    }

    /// Stamps `ai_suggested_order` from `ordered_ids`, keeping only the
    /// listed tasks. See [`ReorderMode::ReplaceWithListed`].
    pub fn reorder_tasks<I, T>(&mut self, ordered_ids: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.reorder_tasks_with(ordered_ids, ReorderMode::ReplaceWithListed);
    }

    /// Stamps `ai_suggested_order` with each id's position in `ordered_ids`.
    ///
    /// Unknown ids are skipped. A repeated id keeps its first position.
    pub fn reorder_tasks_with<I, T>(&mut self, ordered_ids: I, mode: ReorderMode)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut positions: Vec<(TaskId, u32)> = Vec::new();
        let mut seen: HashSet<TaskId> = HashSet::new();
        for (index, id) in ordered_ids.into_iter().enumerate() {
            let id = id.as_ref().to_string();
            if seen.insert(id.clone()) {
                positions.push((id, u32::try_from(index).unwrap_or(u32::MAX)));
            }
        }

        let reordered: Vec<Task> = match mode {
            ReorderMode::ReplaceWithListed => positions
                .iter()
                .filter_map(|(id, position)| {
                    self.task(id).map(|task| Task {
                        ai_suggested_order: Some(*position),
                        ..task.clone()
                    })
                })
                .collect(),
            ReorderMode::StampListed => {
                let lookup: HashMap<&str, u32> = positions
                    .iter()
                    .map(|(id, position)| (id.as_str(), *position))
                    .collect();
                self.state
                    .tasks
                    .iter()
                    .map(|task| match lookup.get(task.id.as_str()) {
                        Some(position) => Task {
                            ai_suggested_order: Some(*position),
                            ..task.clone()
                        },
                        None => task.clone(),
                    })
                    .collect()
            }
        };

        let dropped = self.state.tasks.len().saturating_sub(reordered.len());
        self.state.tasks = reordered;
        info!(
            "event=tasks_reorder module=store status=ok mode={:?} listed={} dropped={}",
            mode,
            positions.len(),
            dropped
        );
        self.commit();
    }

    /// Proposes free time blocks for a task. Does not modify the store.
    ///
    /// Returns an empty list for unknown or closed tasks.
    pub fn suggest_time_slots(&self, task_id: &str) -> Vec<CalendarEvent> {
        let Some(task) = self.task(task_id) else {
            return Vec::new();
        };
        scheduler::suggest_time_slots(
            task,
            &self.state.events,
            &self.state.user_preferences,
            self.clock.now(),
        )
    }

    /// Removes every `Done` task. Returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.state.tasks.len();
        let remaining: Vec<Task> = self
            .state
            .tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Done)
            .cloned()
            .collect();
        self.state.tasks = remaining;
        let removed = before - self.state.tasks.len();

        info!("event=tasks_clear_completed module=store status=ok removed={removed}");
        self.commit();
        removed
    }

    /// Serializes tasks, events and preferences with an export timestamp.
    pub fn export_data(&self) -> StoreResult<String> {
        let snapshot = persist::ExportSnapshot {
            tasks: &self.state.tasks,
            events: &self.state.events,
            user_preferences: &self.state.user_preferences,
            export_date: self.clock.now_utc(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Replaces tasks, events and preferences from exported text.
    ///
    /// Returns `false` and leaves state untouched when `data` cannot be
    /// parsed into the export shape, repeats a task or event id, or holds a
    /// record that fails `validate()`.
    pub fn import_data(&mut self, data: &str) -> bool {
        let payload: persist::ImportPayload = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    "event=store_import module=store status=error line={} column={} error_class={:?}",
                    err.line(),
                    err.column(),
                    err.classify()
                );
                return false;
            }
        };

        if let Err(rejection) = payload.check() {
            warn!(
                "event=store_import module=store status=error reason={}",
                rejection.code()
            );
            return false;
        }

        self.state.tasks = payload.tasks.unwrap_or_default();
        self.state.events = payload.events.unwrap_or_default();
        if let Some(preferences) = payload.user_preferences {
            self.state.user_preferences = preferences;
        }

        info!(
            "event=store_import module=store status=ok tasks={} events={}",
            self.state.tasks.len(),
            self.state.events.len()
        );
        self.commit();
        true
    }

    /// Session-only; not persisted and does not stamp `last_sync`.
    pub fn set_selected_date(&mut self, date: NaiveDate) {
        self.state.selected_date = date;
    }

    /// Session-only; not persisted and does not stamp `last_sync`.
    pub fn set_loading(&mut self, is_loading: bool) {
        self.state.is_loading = is_loading;
    }

    pub fn today_tasks(&self) -> Vec<Task> {
        selectors::today_tasks(&self.state.tasks, self.clock.now())
    }

    pub fn overdue_tasks(&self) -> Vec<Task> {
        selectors::overdue_tasks(&self.state.tasks, self.clock.now())
    }

    pub fn upcoming_tasks(&self) -> Vec<Task> {
        selectors::upcoming_tasks(&self.state.tasks, self.clock.now())
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        selectors::tasks_by_status(&self.state.tasks, status)
    }

    pub fn tasks_by_priority(&self, priority: TaskPriority) -> Vec<Task> {
        selectors::tasks_by_priority(&self.state.tasks, priority)
    }

    pub fn movable_tasks(&self) -> Vec<Task> {
        selectors::movable_tasks(&self.state.tasks, self.clock.now())
    }

    pub fn similar_tasks(&self, category: TaskCategory, duration: u32) -> Vec<Task> {
        selectors::similar_tasks(&self.state.tasks, category, duration)
    }

    pub fn completion_rate(&self) -> f64 {
        selectors::completion_rate(&self.state.tasks)
    }

    pub fn workload_metrics(&self) -> WorkloadMetrics {
        selectors::workload_metrics(&self.state.tasks)
    }

    pub fn filter_tasks(&self, filter: TaskFilter) -> Vec<Task> {
        selectors::filter_tasks(&self.state.tasks, filter, self.clock.now())
    }

    /// Events touching the selected date, recurrences expanded.
    pub fn selected_day_events(&self) -> Vec<CalendarEvent> {
        let now = self.clock.now();
        selectors::events_on_date(&self.state.events, self.state.selected_date, *now.offset())
    }

    /// Post-mutation hook: stamps `last_sync`, then persists.
    fn commit(&mut self) {
        self.state.last_sync = Some(self.clock.now_utc());
        self.persist();
    }

    fn back_up_corrupt_envelope(&mut self, text: &str) {
        match self.storage.set_item(CORRUPT_BACKUP_KEY, text) {
            Ok(()) => warn!(
                "event=store_backup module=store status=ok key={CORRUPT_BACKUP_KEY} bytes={}",
                text.len()
            ),
            Err(err) => error!("event=store_backup module=store status=error error={err}"),
        }
    }

    fn persist(&mut self) {
        let started_at = Instant::now();
        let result = persist::encode_state(&self.state).and_then(|text| {
            self.storage
                .set_item(STORAGE_KEY, &text)
                .map_err(StoreError::from)
        });
        match result {
            Ok(()) => debug!(
                "event=store_persist module=store status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_persist module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Next `updated_at`: `now`, or one millisecond past `previous` when the
/// clock has not moved forward.
fn next_update_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}
