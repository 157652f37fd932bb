//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its closed enumerations.
//! - Define creation drafts and partial-update patches for tasks.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `updated_at` is never earlier than `created_at`.
//! - `completed_at` is conventionally set only for `TaskStatus::Done`, but
//!   the store does not enforce it.

use super::patch::double_option;
use super::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque task identifier.
pub type TaskId = String;

/// Task urgency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Numeric weight used by workload metrics (`Low=1` .. `Urgent=4`).
    pub fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Urgent => 4,
        }
    }

    /// Returns whether this priority counts as "high" for metrics and filters.
    pub fn is_high(self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}

/// Task lifecycle state.
///
/// Transitions are unrestricted: any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Done,
    /// No longer actionable. Soft-deleted tasks land here.
    Cancelled,
}

impl TaskStatus {
    /// Returns whether the task still needs work (`Todo` or `InProgress`).
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Todo | Self::InProgress)
    }

    /// Returns whether the task left the active set (`Done` or `Cancelled`).
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

/// Life area a task belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Work,
    Personal,
    Health,
    Learning,
    Finance,
    Social,
}

/// Preferred part of the day for working on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestTimeToDo {
    Morning,
    Afternoon,
    Evening,
    Anytime,
}

impl BestTimeToDo {
    /// Local-hour band `[start, end)` for this preference.
    ///
    /// Returns `None` for `Anytime`.
    pub fn hour_band(self) -> Option<(u32, u32)> {
        match self {
            Self::Morning => Some((6, 12)),
            Self::Afternoon => Some((12, 17)),
            Self::Evening => Some((17, 22)),
            Self::Anytime => None,
        }
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: TaskCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Minutes.
    pub estimated_duration: u32,
    pub best_time_to_do: BestTimeToDo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggested_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<TaskId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Minutes actually spent. Set after completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u32>,
    /// 1..=5 rating. Set after completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<u8>,
}

impl Task {
    /// Builds a task from a draft with caller-provided identity and timestamp.
    ///
    /// Both `created_at` and `updated_at` are set to `now`.
    pub fn from_draft(id: impl Into<TaskId>, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            created_at: now,
            updated_at: now,
            deadline: draft.deadline,
            completed_at: draft.completed_at,
            priority: draft.priority,
            status: draft.status,
            estimated_duration: draft.estimated_duration,
            best_time_to_do: draft.best_time_to_do,
            ai_suggested_order: draft.ai_suggested_order,
            dependencies: draft.dependencies,
            tags: draft.tags,
            actual_duration: draft.actual_duration,
            satisfaction: draft.satisfaction,
        }
    }

    /// Applies every field present in `patch`.
    ///
    /// Does not touch `id`, `created_at` or `updated_at`.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(estimated_duration) = patch.estimated_duration {
            self.estimated_duration = estimated_duration;
        }
        if let Some(best_time_to_do) = patch.best_time_to_do {
            self.best_time_to_do = best_time_to_do;
        }
        if let Some(order) = patch.ai_suggested_order {
            self.ai_suggested_order = order;
        }
        if let Some(dependencies) = patch.dependencies {
            self.dependencies = dependencies;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(actual_duration) = patch.actual_duration {
            self.actual_duration = actual_duration;
        }
        if let Some(satisfaction) = patch.satisfaction {
            self.satisfaction = satisfaction;
        }
    }

    /// Validates field-level invariants.
    ///
    /// The store accepts unvalidated records; boundary callers use this
    /// before handing user input to the store.
    ///
    /// # Errors
    /// - `EmptyTitle` when the trimmed title is empty.
    /// - `SatisfactionOutOfRange` when satisfaction is outside `1..=5`.
    /// - `UpdatedBeforeCreated` when `updated_at < created_at`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_task_fields(&self.title, self.satisfaction)?;
        if self.updated_at < self.created_at {
            return Err(ValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }
}

/// Input for task creation: a task without identity or system timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: TaskCategory,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub estimated_duration: u32,
    pub best_time_to_do: BestTimeToDo,
    #[serde(default)]
    pub ai_suggested_order: Option<u32>,
    #[serde(default)]
    pub dependencies: Option<Vec<TaskId>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub actual_duration: Option<u32>,
    #[serde(default)]
    pub satisfaction: Option<u8>,
}

impl TaskDraft {
    /// Creates a draft with only the required fields set.
    pub fn new(
        title: impl Into<String>,
        category: TaskCategory,
        priority: TaskPriority,
        estimated_duration: u32,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            category,
            deadline: None,
            completed_at: None,
            priority,
            status: TaskStatus::Todo,
            estimated_duration,
            best_time_to_do: BestTimeToDo::Anytime,
            ai_suggested_order: None,
            dependencies: None,
            tags: None,
            actual_duration: None,
            satisfaction: None,
        }
    }

    /// Validates the user-supplied fields of this draft.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_task_fields(&self.title, self.satisfaction)
    }
}

/// Partial task update.
///
/// `None` leaves a field untouched. For optional task fields, `Some(None)`
/// clears the value; in JSON that is an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub category: Option<TaskCategory>,
    #[serde(deserialize_with = "double_option")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "double_option")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub estimated_duration: Option<u32>,
    pub best_time_to_do: Option<BestTimeToDo>,
    #[serde(deserialize_with = "double_option")]
    pub ai_suggested_order: Option<Option<u32>>,
    #[serde(deserialize_with = "double_option")]
    pub dependencies: Option<Option<Vec<TaskId>>>,
    #[serde(deserialize_with = "double_option")]
    pub tags: Option<Option<Vec<String>>>,
    #[serde(deserialize_with = "double_option")]
    pub actual_duration: Option<Option<u32>>,
    #[serde(deserialize_with = "double_option")]
    pub satisfaction: Option<Option<u8>>,
}

impl TaskPatch {
    /// Patch that only sets `status`.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Validates only the fields this patch sets.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle);
            }
        }
        if let Some(Some(value)) = self.satisfaction {
            check_satisfaction(value)?;
        }
        Ok(())
    }
}

fn validate_task_fields(title: &str, satisfaction: Option<u8>) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if let Some(value) = satisfaction {
        check_satisfaction(value)?;
    }
    Ok(())
}

fn check_satisfaction(value: u8) -> Result<(), ValidationError> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::SatisfactionOutOfRange(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let now = Utc.with_ymd_and_hms(2024, 10, 29, 9, 0, 0).unwrap();
        let draft = TaskDraft::new("Plan week", TaskCategory::Personal, TaskPriority::Medium, 30);
        Task::from_draft("t-1", draft, now)
    }

    #[test]
    fn from_draft_sets_both_timestamps() {
        let task = sample_task();
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[test]
    fn apply_can_clear_optional_fields() {
        let mut task = sample_task();
        task.tags = Some(vec!["home".to_string()]);

        task.apply(TaskPatch {
            tags: Some(None),
            priority: Some(TaskPriority::High),
            ..TaskPatch::default()
        });

        assert_eq!(task.tags, None);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.title, "Plan week");
    }

    #[test]
    fn patch_json_distinguishes_null_from_absent() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"description": null, "status": "done"}"#).unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.deadline, None);
        assert_eq!(patch.status, Some(TaskStatus::Done));
    }

    #[test]
    fn validate_rejects_blank_title_and_bad_rating() {
        let mut task = sample_task();
        task.title = "   ".to_string();
        assert_eq!(task.validate(), Err(ValidationError::EmptyTitle));

        let mut task = sample_task();
        task.satisfaction = Some(6);
        assert_eq!(
            task.validate(),
            Err(ValidationError::SatisfactionOutOfRange(6))
        );
    }

    #[test]
    fn validate_rejects_update_before_creation() {
        let mut task = sample_task();
        task.updated_at = task.created_at - chrono::Duration::seconds(1);
        assert!(matches!(
            task.validate(),
            Err(ValidationError::UpdatedBeforeCreated { .. })
        ));
    }

    #[test]
    fn priority_weights_follow_urgency() {
        assert_eq!(TaskPriority::Low.weight(), 1);
        assert_eq!(TaskPriority::Urgent.weight(), 4);
        assert!(TaskPriority::High.is_high());
        assert!(!TaskPriority::Medium.is_high());
    }

    #[test]
    fn task_serializes_with_camel_case_fields() {
        let value = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(value["estimatedDuration"], 30);
        assert_eq!(value["bestTimeToDo"], "anytime");
        assert!(value.get("deadline").is_none());
    }
}
