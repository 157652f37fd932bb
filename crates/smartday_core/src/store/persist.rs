//! Persisted state envelope, schema migration and export/import shapes.
//!
//! # Responsibility
//! - Encode the persisted subset of `AppState` with its schema version.
//! - Upgrade older envelopes before they are decoded into domain types.
//! - Define the export snapshot and the tolerant import payload.
//!
//! # Invariants
//! - Envelopes are always written with `SCHEMA_VERSION`.
//! - A missing `version` key reads as version 0.
//! - Envelopes newer than `SCHEMA_VERSION` are rejected, never downgraded.

use super::{StoreError, StoreResult};
use crate::model::event::CalendarEvent;
use crate::model::preferences::UserPreferences;
use crate::model::state::AppState;
use crate::model::task::Task;
use crate::model::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Fixed storage key for the persisted envelope.
pub const STORAGE_KEY: &str = "app-storage";
/// Where an undecodable envelope is copied before the store starts empty.
pub const CORRUPT_BACKUP_KEY: &str = "app-storage.corrupt";
/// Current envelope schema version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a> {
    tasks: &'a [Task],
    events: &'a [CalendarEvent],
    user_preferences: &'a UserPreferences,
    version: u32,
}

/// Decoded persisted envelope, already migrated to `SCHEMA_VERSION`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(default)]
    pub user_preferences: UserPreferences,
    #[serde(default)]
    pub version: u32,
}

/// Serializes the persisted subset of `state`.
pub fn encode_state(state: &AppState) -> StoreResult<String> {
    let envelope = EnvelopeRef {
        tasks: &state.tasks,
        events: &state.events,
        user_preferences: &state.user_preferences,
        version: SCHEMA_VERSION,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parses and migrates a persisted envelope.
///
/// # Errors
/// - `Serialization` when the text is not JSON or has the wrong shape.
/// - `UnsupportedSchemaVersion` when the envelope is newer than supported.
/// - `InvalidPersistedState` when the root is not a JSON object.
pub fn decode_state(text: &str) -> StoreResult<PersistedState> {
    let mut root: Value = serde_json::from_str(text)?;
    let Some(object) = root.as_object_mut() else {
        return Err(StoreError::InvalidPersistedState(
            "persisted root must be a JSON object".to_string(),
        ));
    };

    let stored_version = match object.get("version") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            StoreError::InvalidPersistedState(format!("invalid version value `{value}`"))
        })?,
    };
    if stored_version > u64::from(SCHEMA_VERSION) {
        return Err(StoreError::UnsupportedSchemaVersion {
            version: stored_version,
            latest_supported: u64::from(SCHEMA_VERSION),
        });
    }

    // Bounded by SCHEMA_VERSION above.
    let mut version = stored_version as u32;
    while version < SCHEMA_VERSION {
        if version == 0 {
            migrate_v0_to_v1(object);
        }
        version += 1;
    }
    object.insert("version".to_string(), Value::from(SCHEMA_VERSION));

    Ok(serde_json::from_value(root)?)
}

/// v0 → v1: preference records gain `aiAssistance` and `autoReschedule`.
fn migrate_v0_to_v1(root: &mut Map<String, Value>) {
    if let Some(Value::Object(preferences)) = root.get_mut("userPreferences") {
        preferences
            .entry("aiAssistance")
            .or_insert(Value::Bool(true));
        preferences
            .entry("autoReschedule")
            .or_insert(Value::Bool(false));
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportSnapshot<'a> {
    pub tasks: &'a [Task],
    pub events: &'a [CalendarEvent],
    pub user_preferences: &'a UserPreferences,
    pub export_date: DateTime<Utc>,
}

/// Import payload. Missing or `null` collections mean "empty"; missing
/// preferences mean "keep current". `exportDate` and unknown keys are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportPayload {
    pub tasks: Option<Vec<Task>>,
    pub events: Option<Vec<CalendarEvent>>,
    pub user_preferences: Option<UserPreferences>,
}

/// Reason a parsed import payload was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportRejection {
    DuplicateTaskId,
    DuplicateEventId,
    InvalidTask(ValidationError),
    InvalidEvent(ValidationError),
}

impl ImportRejection {
    /// Stable log code; never includes record content.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateTaskId => "duplicate_task_id",
            Self::DuplicateEventId => "duplicate_event_id",
            Self::InvalidTask(_) => "invalid_task",
            Self::InvalidEvent(_) => "invalid_event",
        }
    }
}

impl ImportPayload {
    /// Checks the record invariants the store relies on: unique ids within
    /// each collection and `validate()` passing on every record.
    pub fn check(&self) -> Result<(), ImportRejection> {
        let tasks = self.tasks.as_deref().unwrap_or_default();
        let mut task_ids = HashSet::with_capacity(tasks.len());
        for task in tasks {
            if !task_ids.insert(task.id.as_str()) {
                return Err(ImportRejection::DuplicateTaskId);
            }
            task.validate().map_err(ImportRejection::InvalidTask)?;
        }

        let events = self.events.as_deref().unwrap_or_default();
        let mut event_ids = HashSet::with_capacity(events.len());
        for event in events {
            if !event_ids.insert(event.id.as_str()) {
                return Err(ImportRejection::DuplicateEventId);
            }
            event.validate().map_err(ImportRejection::InvalidEvent)?;
        }
        Ok(())
    }
}
