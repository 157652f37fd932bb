//! Field-level validation errors for domain records.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Domain validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty after trimming.
    EmptyTitle,
    /// Satisfaction rating outside `1..=5`.
    SatisfactionOutOfRange(u8),
    /// Event ends at or before it starts.
    EventEndNotAfterStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Recurrence stops before the first occurrence.
    RecurrenceEndBeforeStart {
        start: DateTime<Utc>,
        recurrence_end: DateTime<Utc>,
    },
    /// Record claims an update earlier than its creation.
    UpdatedBeforeCreated {
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::SatisfactionOutOfRange(value) => {
                write!(f, "satisfaction must be within 1..=5, got {value}")
            }
            Self::EventEndNotAfterStart { start, end } => write!(
                f,
                "end_time ({}) must be after start_time ({})",
                end.to_rfc3339(),
                start.to_rfc3339()
            ),
            Self::RecurrenceEndBeforeStart {
                start,
                recurrence_end,
            } => write!(
                f,
                "recurrence_end ({}) must not be before start_time ({})",
                recurrence_end.to_rfc3339(),
                start.to_rfc3339()
            ),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at ({}) must not be before created_at ({})",
                updated_at.to_rfc3339(),
                created_at.to_rfc3339()
            ),
        }
    }
}

impl Error for ValidationError {}
