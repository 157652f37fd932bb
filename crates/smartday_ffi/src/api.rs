//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the state store's operations to Dart via FRB.
//! - Validate user-supplied drafts and patches before they reach the store.
//! - Keep error semantics simple: every failure becomes an envelope message.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One store handle per process, opened lazily at the default path.
//! - Structured payloads cross the boundary as camelCase JSON text.

use log::warn;
use smartday_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AppStore, DeleteMode, EventDraft, EventPatch, PreferencesPatch, SqliteStateStorage,
    SystemClock, TaskDraft, TaskFilter, TaskPatch, ValidationError,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};

const STORE_DB_FILE_NAME: &str = "smartday_store.sqlite3";
const STORE_DB_PATH_ENV: &str = "SMARTDAY_DB_PATH";

type SqliteStore = AppStore<SqliteStateStorage>;

static STORE: OnceLock<Mutex<Option<SqliteStore>>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope for store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the affected task or event, when there is one.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl StoreActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Response envelope for reads that return structured data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQueryResponse {
    pub ok: bool,
    /// JSON text; empty on failure.
    pub payload: String,
    pub message: String,
}

impl StoreQueryResponse {
    fn success(payload: String) -> Self {
        Self {
            ok: true,
            payload,
            message: String::new(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: String::new(),
            message: message.into(),
        }
    }
}

/// Opens (or reopens) the process store at `db_path`.
///
/// An empty `db_path` falls back to `$SMARTDAY_DB_PATH`, then to
/// `<tmp>/smartday_store.sqlite3`. Any previously open store is dropped.
///
/// # FFI contract
/// - Sync call; reads the persisted blob.
/// - An undecodable blob is backed up and the store starts empty.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn store_open(db_path: String) -> StoreActionResponse {
    let path = if db_path.trim().is_empty() {
        default_db_path()
    } else {
        PathBuf::from(db_path.trim())
    };
    let opened = match open_store_at(&path) {
        Ok(store) => store,
        Err(err) => return StoreActionResponse::failure(format!("store_open failed: {err}")),
    };
    let message = format!(
        "Store opened with {} task(s) and {} event(s).",
        opened.tasks().len(),
        opened.events().len()
    );
    *lock_slot() = Some(opened);
    StoreActionResponse::success(message, None)
}

/// Creates a task from a camelCase `TaskDraft` JSON object.
#[flutter_rust_bridge::frb(sync)]
pub fn task_add(draft_json: String) -> StoreActionResponse {
    let draft: TaskDraft = match serde_json::from_str(&draft_json) {
        Ok(draft) => draft,
        Err(err) => return StoreActionResponse::failure(format!("task_add invalid draft: {err}")),
    };
    if let Err(err) = draft.validate() {
        return StoreActionResponse::failure(format!("task_add rejected: {err}"));
    }
    match with_store(|store| store.add_task(draft)) {
        Ok(task) => StoreActionResponse::success("Task created.", Some(task.id)),
        Err(err) => StoreActionResponse::failure(format!("task_add failed: {err}")),
    }
}

/// Applies a camelCase `TaskPatch` JSON object to task `id`.
///
/// An explicit `null` clears an optional field; absent keys are untouched.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(id: String, patch_json: String) -> StoreActionResponse {
    let patch: TaskPatch = match serde_json::from_str(&patch_json) {
        Ok(patch) => patch,
        Err(err) => {
            return StoreActionResponse::failure(format!("task_update invalid patch: {err}"))
        }
    };
    if let Err(err) = patch.validate() {
        return StoreActionResponse::failure(format!("task_update rejected: {err}"));
    }
    found_response(
        "task_update",
        "Task updated.",
        with_store(|store| store.update_task(&id, patch).map(|task| task.id)),
    )
}

/// Cancels (`soft=true`) or removes task `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: String, soft: bool) -> StoreActionResponse {
    let mode = if soft {
        DeleteMode::Soft
    } else {
        DeleteMode::Hard
    };
    found_response(
        "task_delete",
        "Task deleted.",
        with_store(|store| store.delete_task(&id, mode).then(|| id.clone())),
    )
}

/// Marks task `id` done, recording `actual_duration` minutes when given.
#[flutter_rust_bridge::frb(sync)]
pub fn task_complete(id: String, actual_duration: Option<u32>) -> StoreActionResponse {
    found_response(
        "task_complete",
        "Task completed.",
        with_store(|store| store.complete_task(&id, actual_duration).map(|task| task.id)),
    )
}

/// Flips task `id` between done and todo.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle(id: String) -> StoreActionResponse {
    found_response(
        "task_toggle",
        "Task toggled.",
        with_store(|store| store.toggle_task(&id).map(|task| task.id)),
    )
}

/// Applies an AI ordering. Tasks not named in `ids` are dropped.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_reorder(ids: Vec<String>) -> StoreActionResponse {
    match with_store(|store| {
        store.reorder_tasks(&ids);
        store.tasks().len()
    }) {
        Ok(count) => StoreActionResponse::success(format!("Reordered {count} task(s)."), None),
        Err(err) => StoreActionResponse::failure(format!("tasks_reorder failed: {err}")),
    }
}

/// Removes every done task.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_clear_completed() -> StoreActionResponse {
    match with_store(|store| store.clear_completed()) {
        Ok(removed) => StoreActionResponse::success(format!("Removed {removed} task(s)."), None),
        Err(err) => StoreActionResponse::failure(format!("tasks_clear_completed failed: {err}")),
    }
}

/// Creates an event from a camelCase `EventDraft` JSON object.
///
/// Rejects drafts whose end is not after their start.
#[flutter_rust_bridge::frb(sync)]
pub fn event_add(draft_json: String) -> StoreActionResponse {
    let draft: EventDraft = match serde_json::from_str(&draft_json) {
        Ok(draft) => draft,
        Err(err) => {
            return StoreActionResponse::failure(format!("event_add invalid draft: {err}"))
        }
    };
    if let Err(err) = draft.validate() {
        return StoreActionResponse::failure(format!("event_add rejected: {err}"));
    }
    match with_store(|store| store.add_event(draft)) {
        Ok(event) => StoreActionResponse::success("Event created.", Some(event.id)),
        Err(err) => StoreActionResponse::failure(format!("event_add failed: {err}")),
    }
}

/// Applies a camelCase `EventPatch` JSON object to event `id`.
///
/// The patched event is validated as a whole before it is stored.
#[flutter_rust_bridge::frb(sync)]
pub fn event_update(id: String, patch_json: String) -> StoreActionResponse {
    let patch: EventPatch = match serde_json::from_str(&patch_json) {
        Ok(patch) => patch,
        Err(err) => {
            return StoreActionResponse::failure(format!("event_update invalid patch: {err}"))
        }
    };
    let outcome = with_store(|store| -> Result<Option<String>, ValidationError> {
        let Some(mut preview) = store.event(&id).cloned() else {
            return Ok(None);
        };
        preview.apply(patch.clone());
        preview.validate()?;
        Ok(store.update_event(&id, patch).map(|event| event.id))
    });
    match outcome {
        Ok(Ok(found)) => found_response("event_update", "Event updated.", Ok(found)),
        Ok(Err(err)) => StoreActionResponse::failure(format!("event_update rejected: {err}")),
        Err(err) => StoreActionResponse::failure(format!("event_update failed: {err}")),
    }
}

/// Removes event `id`. Linked tasks are left alone.
#[flutter_rust_bridge::frb(sync)]
pub fn event_delete(id: String) -> StoreActionResponse {
    found_response(
        "event_delete",
        "Event deleted.",
        with_store(|store| store.delete_event(&id).then(|| id.clone())),
    )
}

/// Merges a camelCase `PreferencesPatch` JSON object into the preferences.
///
/// Returns the merged preferences as JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn preferences_update(patch_json: String) -> StoreQueryResponse {
    let patch: PreferencesPatch = match serde_json::from_str(&patch_json) {
        Ok(patch) => patch,
        Err(err) => {
            return StoreQueryResponse::failure(format!("preferences_update invalid patch: {err}"))
        }
    };
    query_response(
        "preferences_update",
        with_store(|store| serde_json::to_string(&store.update_preferences(patch))),
    )
}

/// Proposed time blocks for task `task_id`, as a JSON event array.
///
/// Unknown or closed tasks yield `[]`. Nothing is stored.
#[flutter_rust_bridge::frb(sync)]
pub fn suggest_time_slots(task_id: String) -> StoreQueryResponse {
    query_response(
        "suggest_time_slots",
        with_store(|store| serde_json::to_string(&store.suggest_time_slots(&task_id))),
    )
}

/// JSON export of tasks, events and preferences.
#[flutter_rust_bridge::frb(sync)]
pub fn export_data() -> StoreQueryResponse {
    match with_store(|store| store.export_data()) {
        Ok(Ok(text)) => StoreQueryResponse::success(text),
        Ok(Err(err)) => StoreQueryResponse::failure(format!("export_data failed: {err}")),
        Err(err) => StoreQueryResponse::failure(format!("export_data failed: {err}")),
    }
}

/// Replaces tasks, events and preferences from exported text.
///
/// Malformed text, repeated ids or invalid records leave the store
/// untouched and return `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn import_data(text: String) -> StoreActionResponse {
    match with_store(|store| store.import_data(&text)) {
        Ok(true) => StoreActionResponse::success("Data imported.", None),
        Ok(false) => StoreActionResponse::failure("import_data rejected: malformed or invalid export text"),
        Err(err) => StoreActionResponse::failure(format!("import_data failed: {err}")),
    }
}

/// Tasks matching `filter` (`all|today|completed|priority`) as JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_query(filter: String) -> StoreQueryResponse {
    let Some(filter) = TaskFilter::parse(&filter) else {
        return StoreQueryResponse::failure(format!(
            "tasks_query unsupported filter `{}`; expected all|today|completed|priority",
            filter.trim()
        ));
    };
    query_response(
        "tasks_query",
        with_store(|store| serde_json::to_string(&store.filter_tasks(filter))),
    )
}

/// Percentage of tasks that are done, 0 for an empty store or on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn completion_rate() -> f64 {
    match with_store(|store| store.completion_rate()) {
        Ok(rate) => rate,
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error call=completion_rate error={err}");
            0.0
        }
    }
}

/// Pending-task aggregates as JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn workload_metrics() -> StoreQueryResponse {
    query_response(
        "workload_metrics",
        with_store(|store| serde_json::to_string(&store.workload_metrics())),
    )
}

#[derive(Debug)]
enum StoreAccessError {
    Store(smartday_core::StoreError),
}

impl std::fmt::Display for StoreAccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store open failed: {err}"),
        }
    }
}

fn default_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(STORE_DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(STORE_DB_FILE_NAME)
}

fn open_store_at(path: &std::path::Path) -> Result<SqliteStore, smartday_core::StoreError> {
    let storage = SqliteStateStorage::open(path)?;
    AppStore::open(storage, SystemClock)
}

fn lock_slot() -> MutexGuard<'static, Option<SqliteStore>> {
    STORE
        .get_or_init(|| Mutex::new(None))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `f` against the process store, opening the default store first
/// when none is open.
fn with_store<T>(f: impl FnOnce(&mut SqliteStore) -> T) -> Result<T, StoreAccessError> {
    let mut slot = lock_slot();
    let store = match slot.take() {
        Some(store) => store,
        None => open_store_at(&default_db_path()).map_err(StoreAccessError::Store)?,
    };
    Ok(f(slot.insert(store)))
}

fn found_response(
    call: &str,
    message: &str,
    outcome: Result<Option<String>, StoreAccessError>,
) -> StoreActionResponse {
    match outcome {
        Ok(Some(id)) => StoreActionResponse::success(message, Some(id)),
        Ok(None) => StoreActionResponse::failure(format!("{call}: not found")),
        Err(err) => StoreActionResponse::failure(format!("{call} failed: {err}")),
    }
}

fn query_response(
    call: &str,
    outcome: Result<Result<String, serde_json::Error>, StoreAccessError>,
) -> StoreQueryResponse {
    match outcome {
        Ok(Ok(payload)) => StoreQueryResponse::success(payload),
        Ok(Err(err)) => StoreQueryResponse::failure(format!("{call} serialization failed: {err}")),
        Err(err) => StoreQueryResponse::failure(format!("{call} failed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        completion_rate, core_version, event_add, event_update, export_data, import_data,
        init_logging, ping, store_open, suggest_time_slots, task_add, task_delete, task_toggle,
        task_update, tasks_query, tasks_reorder, workload_metrics,
    };
    use smartday_core::{SqliteStateStorage, StateStorage, CORRUPT_BACKUP_KEY, STORAGE_KEY};
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    // Calls share the process store; serialize tests that reopen it.
    static STORE_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn fresh_store() -> (MutexGuard<'static, ()>, TempDir) {
        let guard = STORE_TEST_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        let opened = store_open(path.to_str().unwrap().to_string());
        assert!(opened.ok, "{}", opened.message);
        (guard, dir)
    }

    fn task_json(title: &str) -> String {
        serde_json::json!({
            "title": title,
            "category": "work",
            "priority": "high",
            "status": "todo",
            "estimatedDuration": 45,
            "bestTimeToDo": "morning"
        })
        .to_string()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn task_add_then_toggle_round_trips_through_queries() {
        let (_guard, _dir) = fresh_store();

        let created = task_add(task_json("Draft report"));
        assert!(created.ok, "{}", created.message);
        let id = created.id.unwrap();

        let toggled = task_toggle(id.clone());
        assert!(toggled.ok, "{}", toggled.message);
        assert_eq!(completion_rate(), 100.0);

        let completed = tasks_query("completed".to_string());
        assert!(completed.ok);
        let tasks: serde_json::Value = serde_json::from_str(&completed.payload).unwrap();
        assert_eq!(tasks[0]["id"], id.as_str());
        assert_eq!(tasks[0]["status"], "done");
    }

    #[test]
    fn task_add_rejects_blank_title() {
        let (_guard, _dir) = fresh_store();
        let response = task_add(task_json("   "));
        assert!(!response.ok);
        assert!(response.message.contains("title"));
    }

    #[test]
    fn task_update_rejects_out_of_range_satisfaction() {
        let (_guard, _dir) = fresh_store();
        let id = task_add(task_json("Rate me")).id.unwrap();

        let response = task_update(id, r#"{"satisfaction": 9}"#.to_string());

        assert!(!response.ok);
    }

    #[test]
    fn missing_ids_report_not_found() {
        let (_guard, _dir) = fresh_store();
        assert!(!task_toggle("missing".to_string()).ok);
        assert!(!task_delete("missing".to_string(), false).ok);
        assert!(task_delete("missing".to_string(), true).message.contains("not found"));
    }

    #[test]
    fn event_add_rejects_reversed_time_range() {
        let (_guard, _dir) = fresh_store();
        let response = event_add(
            serde_json::json!({
                "title": "Backwards",
                "type": "meeting",
                "startTime": "2024-10-29T10:00:00Z",
                "endTime": "2024-10-29T09:00:00Z"
            })
            .to_string(),
        );
        assert!(!response.ok);
        assert!(response.message.contains("end"));
    }

    #[test]
    fn event_update_validates_patched_event() {
        let (_guard, _dir) = fresh_store();
        let created = event_add(
            serde_json::json!({
                "title": "Standup",
                "type": "meeting",
                "startTime": "2024-10-29T09:00:00Z",
                "endTime": "2024-10-29T09:30:00Z"
            })
            .to_string(),
        );
        assert!(created.ok, "{}", created.message);
        let id = created.id.unwrap();

        let rejected = event_update(id.clone(), r#"{"endTime": "2024-10-29T08:00:00Z"}"#.to_string());
        assert!(!rejected.ok);

        let accepted = event_update(id, r#"{"location": "Room 4"}"#.to_string());
        assert!(accepted.ok, "{}", accepted.message);
    }

    #[test]
    fn reorder_drops_unlisted_tasks() {
        let (_guard, _dir) = fresh_store();
        let keep = task_add(task_json("keep")).id.unwrap();
        task_add(task_json("drop"));

        let response = tasks_reorder(vec![keep]);

        assert!(response.ok);
        let metrics: serde_json::Value =
            serde_json::from_str(&workload_metrics().payload).unwrap();
        assert_eq!(metrics["pendingCount"], 1);
    }

    #[test]
    fn export_then_import_restores_tasks() {
        let (_guard, _dir) = fresh_store();
        task_add(task_json("exported"));
        let exported = export_data();
        assert!(exported.ok, "{}", exported.message);

        drop(_guard);
        let (_guard, _second_dir) = fresh_store();
        assert!(!import_data("not json".to_string()).ok);
        let imported = import_data(exported.payload);
        assert!(imported.ok, "{}", imported.message);

        let all: serde_json::Value =
            serde_json::from_str(&tasks_query("all".to_string()).payload).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[test]
    fn suggest_time_slots_for_unknown_task_is_empty_array() {
        let (_guard, _dir) = fresh_store();
        let response = suggest_time_slots("missing".to_string());
        assert!(response.ok);
        assert_eq!(response.payload, "[]");
    }

    #[test]
    fn tasks_query_rejects_unknown_filter() {
        let response = tasks_query("someday".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("unsupported filter"));
    }

    #[test]
    fn corrupt_blob_opens_empty_and_accepts_writes() {
        let _guard = STORE_TEST_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        {
            let mut storage = SqliteStateStorage::open(&path).unwrap();
            storage.set_item(STORAGE_KEY, "{truncated").unwrap();
        }

        let opened = store_open(path.to_str().unwrap().to_string());
        assert!(opened.ok, "{}", opened.message);
        let created = task_add(task_json("after corruption"));
        assert!(created.ok, "{}", created.message);
        let all: serde_json::Value =
            serde_json::from_str(&tasks_query("all".to_string()).payload).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);

        let storage = SqliteStateStorage::open(&path).unwrap();
        assert_eq!(
            storage.get_item(CORRUPT_BACKUP_KEY).unwrap().as_deref(),
            Some("{truncated")
        );
    }

    #[test]
    fn import_rejects_repeated_task_ids() {
        let (_guard, _dir) = fresh_store();
        task_add(task_json("existing"));
        let record = serde_json::json!({
            "id": "dup",
            "title": "copy",
            "category": "work",
            "createdAt": "2024-10-29T07:00:00Z",
            "updatedAt": "2024-10-29T07:00:00Z",
            "priority": "low",
            "status": "todo",
            "estimatedDuration": 15,
            "bestTimeToDo": "anytime"
        });
        let text = serde_json::json!({ "tasks": [record.clone(), record] }).to_string();

        let response = import_data(text);

        assert!(!response.ok);
        let all: serde_json::Value =
            serde_json::from_str(&tasks_query("all".to_string()).payload).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);
        assert_eq!(all[0]["title"], "existing");
    }
}
