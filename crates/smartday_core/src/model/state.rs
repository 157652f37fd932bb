//! Aggregate root owned by the state store.

use super::event::CalendarEvent;
use super::preferences::UserPreferences;
use super::task::Task;
use chrono::{DateTime, NaiveDate, Utc};

/// Full in-memory application state.
///
/// Only `tasks`, `events` and `user_preferences` are persisted; the
/// remaining fields are session scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub events: Vec<CalendarEvent>,
    pub user_preferences: UserPreferences,
    pub selected_date: NaiveDate,
    pub is_loading: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

impl AppState {
    /// Empty state with default preferences, selecting `today`.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            tasks: Vec::new(),
            events: Vec::new(),
            user_preferences: UserPreferences::default(),
            selected_date: today,
            is_loading: false,
            last_sync: None,
        }
    }
}
