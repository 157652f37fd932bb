//! User preferences record.
//!
//! One record per installation. Missing fields in serialized input fall back
//! to [`UserPreferences::default`].

use super::patch::double_option;
use super::task::TaskCategory;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fallback working window when stored hours cannot be parsed.
pub const DEFAULT_WORKING_START: &str = "09:00";
pub const DEFAULT_WORKING_END: &str = "17:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

/// Daily working window expressed as `"HH:MM"` text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

impl WorkingHours {
    /// Parses the window into local times.
    ///
    /// Returns `None` when either bound is malformed or `end <= start`.
    pub fn parse(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = parse_hhmm(&self.start)?;
        let end = parse_hhmm(&self.end)?;
        if end <= start {
            return None;
        }
        Some((start, end))
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: DEFAULT_WORKING_START.to_string(),
            end: DEFAULT_WORKING_END.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
    pub reminders: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: false,
            push: true,
            reminders: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Minutes of focused work targeted per day.
    pub daily_focus_goal: u32,
    /// Minutes targeted per category per week.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_goals: Option<BTreeMap<TaskCategory, u32>>,
    pub preferred_working_hours: WorkingHours,
    /// Minutes between breaks.
    pub break_frequency: u32,
    pub theme: Theme,
    pub notification_preferences: NotificationPreferences,
    pub ai_assistance: bool,
    pub auto_reschedule: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
            email: None,
            daily_focus_goal: 240,
            weekly_goals: None,
            preferred_working_hours: WorkingHours::default(),
            break_frequency: 90,
            theme: Theme::Auto,
            notification_preferences: NotificationPreferences::default(),
            ai_assistance: true,
            auto_reschedule: true,
        }
    }
}

impl UserPreferences {
    /// Shallow-merges `patch` into this record.
    ///
    /// Nested records (`preferred_working_hours`, `notification_preferences`,
    /// `weekly_goals`) are replaced as a whole.
    pub fn merge(&mut self, patch: PreferencesPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(goal) = patch.daily_focus_goal {
            self.daily_focus_goal = goal;
        }
        if let Some(weekly_goals) = patch.weekly_goals {
            self.weekly_goals = weekly_goals;
        }
        if let Some(hours) = patch.preferred_working_hours {
            self.preferred_working_hours = hours;
        }
        if let Some(minutes) = patch.break_frequency {
            self.break_frequency = minutes;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(notifications) = patch.notification_preferences {
            self.notification_preferences = notifications;
        }
        if let Some(flag) = patch.ai_assistance {
            self.ai_assistance = flag;
        }
        if let Some(flag) = patch.auto_reschedule {
            self.auto_reschedule = flag;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub daily_focus_goal: Option<u32>,
    #[serde(deserialize_with = "double_option")]
    pub weekly_goals: Option<Option<BTreeMap<TaskCategory, u32>>>,
    pub preferred_working_hours: Option<WorkingHours>,
    pub break_frequency: Option<u32>,
    pub theme: Option<Theme>,
    pub notification_preferences: Option<NotificationPreferences>,
    pub ai_assistance: Option<bool>,
    pub auto_reschedule: Option<bool>,
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let prefs: UserPreferences = serde_json::from_str(r#"{"name": "Sam"}"#).unwrap();
        assert_eq!(prefs.name, "Sam");
        assert_eq!(prefs.daily_focus_goal, 240);
        assert!(prefs.ai_assistance);
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut prefs = UserPreferences::default();
        prefs.merge(PreferencesPatch {
            theme: Some(Theme::Dark),
            email: Some(Some("sam@example.com".to_string())),
            ..PreferencesPatch::default()
        });
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.email.as_deref(), Some("sam@example.com"));
        assert_eq!(prefs.break_frequency, 90);
    }

    #[test]
    fn working_hours_parse_rejects_inverted_window() {
        let hours = WorkingHours {
            start: "18:00".to_string(),
            end: "08:00".to_string(),
        };
        assert_eq!(hours.parse(), None);
        assert!(WorkingHours::default().parse().is_some());
    }

    #[test]
    fn weekly_goals_serialize_with_category_keys() {
        let mut prefs = UserPreferences::default();
        prefs.weekly_goals = Some(BTreeMap::from([(TaskCategory::Health, 120)]));
        let value = serde_json::to_value(&prefs).unwrap();
        assert_eq!(value["weeklyGoals"]["health"], 120);
        assert_eq!(value["preferredWorkingHours"]["start"], "09:00");
    }
}
