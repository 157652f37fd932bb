//! Calendar event domain model.
//!
//! # Responsibility
//! - Define scheduled time blocks, their drafts and patches.
//! - Expand recurring events into concrete occurrences.
//!
//! # Invariants
//! - `end_time` should be after `start_time`; checked by `validate()`, not
//!   enforced on store writes.
//! - `linked_task_id` may dangle after the task is hard-deleted.

use super::patch::double_option;
use super::task::TaskId;
use super::validation::ValidationError;
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Opaque event identifier.
pub type EventId = String;

/// Upper bound on generated occurrences for a single query.
const MAX_OCCURRENCES_PER_QUERY: usize = 1_000;
/// Upper bound on monthly steps walked before giving up (100 years).
const MAX_MONTHLY_STEPS: u32 = 1_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Meeting,
    Appointment,
    TimeBlock,
    Reminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    None,
    Daily,
    Weekly,
    Monthly,
}

/// A concrete `[start, end)` instance of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Occurrence {
    /// Returns whether this occurrence touches `[from, to)`.
    ///
    /// Zero-length occurrences touch the range when they start inside it.
    pub fn touches(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start < to && (self.end > from || self.start >= from)
    }
}

/// Canonical calendar event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: EventType,
    pub recurrence: RecurrencePattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
}

impl CalendarEvent {
    /// Builds an event from a draft with caller-provided identity.
    pub fn from_draft(id: impl Into<EventId>, draft: EventDraft) -> Self {
        Self {
            id: id.into(),
            title: draft.title,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            kind: draft.kind,
            recurrence: draft.recurrence,
            recurrence_end: draft.recurrence_end,
            linked_task_id: draft.linked_task_id,
            location: draft.location,
            attendees: draft.attendees,
        }
    }

    /// Applies every field present in `patch`. `id` is never changed.
    pub fn apply(&mut self, patch: EventPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(recurrence) = patch.recurrence {
            self.recurrence = recurrence;
        }
        if let Some(recurrence_end) = patch.recurrence_end {
            self.recurrence_end = recurrence_end;
        }
        if let Some(linked_task_id) = patch.linked_task_id {
            self.linked_task_id = linked_task_id;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(attendees) = patch.attendees {
            self.attendees = attendees;
        }
    }

    /// Validates title and time-range invariants.
    ///
    /// # Errors
    /// - `EmptyTitle` when the trimmed title is empty.
    /// - `EventEndNotAfterStart` when `end_time <= start_time`.
    /// - `RecurrenceEndBeforeStart` when `recurrence_end < start_time`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_event_fields(&self.title, self.start_time, self.end_time, self.recurrence_end)
    }

    /// Length of a single occurrence. Inverted ranges count as zero.
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time).max(Duration::zero())
    }

    /// Expands this event into the occurrences that touch `[from, to)`.
    ///
    /// Non-recurring events yield at most one occurrence. Recurring events
    /// stop after `recurrence_end` (inclusive on occurrence start).
    pub fn occurrences_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Occurrence> {
        let length = self.duration();
        let mut occurrences = Vec::new();
        if from >= to {
            return occurrences;
        }

        let step = match self.recurrence {
            RecurrencePattern::None => {
                let single = Occurrence {
                    start: self.start_time,
                    end: self.start_time + length,
                };
                if single.touches(from, to) {
                    occurrences.push(single);
                }
                return occurrences;
            }
            RecurrencePattern::Daily => Some(Duration::days(1)),
            RecurrencePattern::Weekly => Some(Duration::weeks(1)),
            RecurrencePattern::Monthly => None,
        };

        match step {
            Some(step) => {
                // Jump close to `from` instead of walking every period.
                let lead = from - length - self.start_time;
                let mut index = if lead > Duration::zero() {
                    (lead.num_seconds() / step.num_seconds()).max(0)
                } else {
                    0
                };
                loop {
                    let start = self.start_time + step * index as i32;
                    if !self.push_occurrence(&mut occurrences, start, length, from, to) {
                        break;
                    }
                    index += 1;
                }
            }
            None => {
                for months in 0..MAX_MONTHLY_STEPS {
                    let Some(start) = self.start_time.checked_add_months(Months::new(months))
                    else {
                        break;
                    };
                    if !self.push_occurrence(&mut occurrences, start, length, from, to) {
                        break;
                    }
                }
            }
        }

        occurrences
    }

    /// Pushes the occurrence at `start` when it touches the range.
    ///
    /// Returns `false` once iteration should stop.
    fn push_occurrence(
        &self,
        occurrences: &mut Vec<Occurrence>,
        start: DateTime<Utc>,
        length: Duration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> bool {
        if start >= to || occurrences.len() >= MAX_OCCURRENCES_PER_QUERY {
            return false;
        }
        if self.recurrence_end.is_some_and(|stop| start > stop) {
            return false;
        }
        let occurrence = Occurrence {
            start,
            end: start + length,
        };
        if occurrence.touches(from, to) {
            occurrences.push(occurrence);
        }
        true
    }
}

/// Input for event creation: an event without identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default = "default_recurrence")]
    pub recurrence: RecurrencePattern,
    #[serde(default)]
    pub recurrence_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub linked_task_id: Option<TaskId>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
}

impl EventDraft {
    /// Creates a non-recurring draft with only the required fields set.
    pub fn new(
        title: impl Into<String>,
        kind: EventType,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            start_time,
            end_time,
            kind,
            recurrence: RecurrencePattern::None,
            recurrence_end: None,
            linked_task_id: None,
            location: None,
            attendees: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_event_fields(&self.title, self.start_time, self.end_time, self.recurrence_end)
    }
}

/// Partial event update. Same `None` / `Some(None)` convention as
/// [`TaskPatch`](super::task::TaskPatch).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventPatch {
    pub title: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<EventType>,
    pub recurrence: Option<RecurrencePattern>,
    #[serde(deserialize_with = "double_option")]
    pub recurrence_end: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "double_option")]
    pub linked_task_id: Option<Option<TaskId>>,
    #[serde(deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub attendees: Option<Option<Vec<String>>>,
}

fn default_recurrence() -> RecurrencePattern {
    RecurrencePattern::None
}

fn validate_event_fields(
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    recurrence_end: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if end <= start {
        return Err(ValidationError::EventEndNotAfterStart { start, end });
    }
    if let Some(stop) = recurrence_end {
        if stop < start {
            return Err(ValidationError::RecurrenceEndBeforeStart {
                start,
                recurrence_end: stop,
            });
        }
    }
    Ok(())
}
