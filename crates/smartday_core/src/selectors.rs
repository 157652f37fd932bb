//! Derived read-only views over tasks and events.
//!
//! Every selector is a pure function of its inputs and is recomputed in full
//! on each call. Calendar-day comparisons use the local date of `now` in
//! `now`'s own offset.

use crate::model::event::CalendarEvent;
use crate::model::task::{Task, TaskCategory, TaskPriority, TaskStatus};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

/// Lookahead window for `upcoming_tasks`.
const UPCOMING_WINDOW_DAYS: i64 = 7;
/// Deadlines further away than this make a task movable.
const MOVABLE_MIN_LEAD_HOURS: i64 = 24;
/// Estimated durations closer than this count as similar.
const SIMILAR_DURATION_TOLERANCE_MINUTES: u32 = 30;

/// Aggregates over pending (`Todo` / `InProgress`) tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadMetrics {
    pub pending_count: usize,
    /// Sum of estimated minutes.
    pub total_estimated_time: u64,
    /// Pending tasks with `High` or `Urgent` priority.
    pub high_priority_count: usize,
    /// Mean of `TaskPriority::weight`, 0 when nothing is pending.
    pub average_priority: f64,
}

/// Task list filters offered by the tasks screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Today,
    Completed,
    /// Pending tasks with `High` or `Urgent` priority.
    Priority,
}

impl TaskFilter {
    /// Parses a case-insensitive filter label.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "today" => Some(Self::Today),
            "completed" => Some(Self::Completed),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }
}

/// Open tasks due on today's local date, plus open tasks with no deadline.
pub fn today_tasks(tasks: &[Task], now: DateTime<FixedOffset>) -> Vec<Task> {
    let today = now.date_naive();
    let offset = *now.offset();
    tasks
        .iter()
        .filter(|task| !task.status.is_closed())
        .filter(|task| match task.deadline {
            None => true,
            Some(deadline) => deadline.with_timezone(&offset).date_naive() == today,
        })
        .cloned()
        .collect()
}

/// Open tasks whose deadline is strictly before `now`.
pub fn overdue_tasks(tasks: &[Task], now: DateTime<FixedOffset>) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| !task.status.is_closed())
        .filter(|task| task.deadline.is_some_and(|deadline| deadline < now))
        .cloned()
        .collect()
}

/// Open tasks due within `(now, now + 7 days]`.
pub fn upcoming_tasks(tasks: &[Task], now: DateTime<FixedOffset>) -> Vec<Task> {
    let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);
    tasks
        .iter()
        .filter(|task| !task.status.is_closed())
        .filter(|task| {
            task.deadline
                .is_some_and(|deadline| deadline > now && deadline <= horizon)
        })
        .cloned()
        .collect()
}

pub fn tasks_by_status(tasks: &[Task], status: TaskStatus) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.status == status)
        .cloned()
        .collect()
}

pub fn tasks_by_priority(tasks: &[Task], priority: TaskPriority) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.priority == priority)
        .cloned()
        .collect()
}

/// Rescheduling candidates: `Todo`, not `Urgent`, and no deadline within
/// the next 24 hours.
pub fn movable_tasks(tasks: &[Task], now: DateTime<FixedOffset>) -> Vec<Task> {
    let lead = Duration::hours(MOVABLE_MIN_LEAD_HOURS);
    tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Todo)
        .filter(|task| task.priority != TaskPriority::Urgent)
        .filter(|task| match task.deadline {
            None => true,
            Some(deadline) => deadline.with_timezone(&Utc) - now.with_timezone(&Utc) > lead,
        })
        .cloned()
        .collect()
}

/// Completed tasks in `category` whose estimate is within 30 minutes
/// (exclusive) of `duration`.
pub fn similar_tasks(tasks: &[Task], category: TaskCategory, duration: u32) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.category == category)
        .filter(|task| {
            task.estimated_duration.abs_diff(duration) < SIMILAR_DURATION_TOLERANCE_MINUTES
        })
        .filter(|task| task.status == TaskStatus::Done)
        .cloned()
        .collect()
}

/// Percentage of tasks that are `Done`; 0 for an empty collection.
pub fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Done)
        .count();
    completed as f64 / tasks.len() as f64 * 100.0
}

pub fn workload_metrics(tasks: &[Task]) -> WorkloadMetrics {
    let pending: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.status.is_pending())
        .collect();

    let total_estimated_time = pending
        .iter()
        .map(|task| u64::from(task.estimated_duration))
        .sum();
    let high_priority_count = pending.iter().filter(|task| task.priority.is_high()).count();
    let average_priority = if pending.is_empty() {
        0.0
    } else {
        let weights: u32 = pending
            .iter()
            .map(|task| u32::from(task.priority.weight()))
            .sum();
        f64::from(weights) / pending.len() as f64
    };

    WorkloadMetrics {
        pending_count: pending.len(),
        total_estimated_time,
        high_priority_count,
        average_priority,
    }
}

pub fn filter_tasks(tasks: &[Task], filter: TaskFilter, now: DateTime<FixedOffset>) -> Vec<Task> {
    match filter {
        TaskFilter::All => tasks.to_vec(),
        TaskFilter::Today => today_tasks(tasks, now),
        TaskFilter::Completed => tasks_by_status(tasks, TaskStatus::Done),
        TaskFilter::Priority => tasks
            .iter()
            .filter(|task| task.status.is_pending() && task.priority.is_high())
            .cloned()
            .collect(),
    }
}

/// Occurrences touching the local day `date`, sorted by start time.
///
/// Recurring events are expanded; each returned copy carries the
/// occurrence's own start and end while keeping the series id.
pub fn events_on_date(
    events: &[CalendarEvent],
    date: NaiveDate,
    offset: FixedOffset,
) -> Vec<CalendarEvent> {
    let (day_start, day_end) = local_day_bounds(date, offset);
    let mut found: Vec<CalendarEvent> = events
        .iter()
        .flat_map(|event| {
            event
                .occurrences_between(day_start, day_end)
                .into_iter()
                .map(move |occurrence| CalendarEvent {
                    start_time: occurrence.start,
                    end_time: occurrence.end,
                    ..event.clone()
                })
        })
        .collect();
    found.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
    found
}

/// UTC bounds `[start, end)` of a local calendar day.
pub(crate) fn local_day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_instant(date, NaiveTime::MIN, offset);
    (start, start + Duration::days(1))
}

/// UTC instant of a local wall-clock time.
pub(crate) fn local_instant(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(time);
    // Fixed offsets map every local time to exactly one instant.
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&(naive - offset)))
}
