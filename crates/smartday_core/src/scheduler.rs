//! Free time-slot search for tasks.
//!
//! Walks each local day in the horizon, subtracts event occurrences from
//! the preferred working window, and places candidate blocks in the gaps.
//! Candidates are ranked by distance to the task's preferred part of day,
//! then by start time.

use crate::model::event::{CalendarEvent, EventType, RecurrencePattern};
use crate::model::preferences::{UserPreferences, WorkingHours};
use crate::model::task::Task;
use crate::selectors::local_instant;
use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use log::debug;
use uuid::Uuid;

/// Number of local days searched, starting today.
pub const SUGGESTION_HORIZON_DAYS: u64 = 7;
/// Maximum number of proposals returned.
pub const MAX_SUGGESTIONS: usize = 3;
/// Shortest block ever proposed, in minutes.
pub const MIN_SLOT_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy)]
struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: DateTime<Utc>,
    distance_minutes: i64,
}

/// Proposes up to `MAX_SUGGESTIONS` time blocks for `task`.
///
/// Returns an empty list when the task is done/cancelled or no gap fits.
/// Proposals are `TimeBlock` events linked to the task; they are not
/// stored anywhere.
pub fn suggest_time_slots(
    task: &Task,
    events: &[CalendarEvent],
    preferences: &UserPreferences,
    now: DateTime<FixedOffset>,
) -> Vec<CalendarEvent> {
    if task.status.is_closed() {
        return Vec::new();
    }
    let Some((work_start, work_end)) = preferences
        .preferred_working_hours
        .parse()
        .or_else(|| WorkingHours::default().parse())
    else {
        return Vec::new();
    };

    let offset = *now.offset();
    let now_utc = now.with_timezone(&Utc);
    let slot = Duration::minutes(i64::from(task.estimated_duration.max(MIN_SLOT_MINUTES)));
    let today = now.date_naive();

    let mut candidates: Vec<Candidate> = Vec::new();
    for day_index in 0..SUGGESTION_HORIZON_DAYS {
        let Some(date) = today.checked_add_days(Days::new(day_index)) else {
            break;
        };
        let mut window = Interval {
            start: local_instant(date, work_start, offset),
            end: local_instant(date, work_end, offset),
        };
        if day_index == 0 && window.start < now_utc {
            window.start = now_utc;
        }
        if window.end - window.start < slot {
            continue;
        }

        let band = preferred_band(task, date, offset);
        for gap in free_gaps(window, events) {
            if gap.end - gap.start < slot {
                continue;
            }
            let latest_start = gap.end - slot;
            let mut starts = vec![gap.start];
            if let Some(band) = band {
                let aligned = band.start.clamp(gap.start, latest_start);
                if aligned != gap.start {
                    starts.push(aligned);
                }
            }

            for start in starts {
                if task.deadline.is_some_and(|deadline| start + slot > deadline) {
                    continue;
                }
                candidates.push(Candidate {
                    start,
                    distance_minutes: band.map_or(0, |band| distance_to_band(start, band)),
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.distance_minutes
            .cmp(&b.distance_minutes)
            .then_with(|| a.start.cmp(&b.start))
    });
    candidates.dedup_by_key(|candidate| candidate.start);

    let proposals: Vec<CalendarEvent> = candidates
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|candidate| CalendarEvent {
            id: Uuid::new_v4().to_string(),
            title: task.title.clone(),
            description: None,
            start_time: candidate.start,
            end_time: candidate.start + slot,
            kind: EventType::TimeBlock,
            recurrence: RecurrencePattern::None,
            recurrence_end: None,
            linked_task_id: Some(task.id.clone()),
            location: None,
            attendees: None,
        })
        .collect();

    debug!(
        "event=suggest_time_slots module=scheduler status=ok task_id={} proposals={}",
        task.id,
        proposals.len()
    );
    proposals
}

/// The task's preferred part of `date`, or `None` for `Anytime`.
fn preferred_band(task: &Task, date: NaiveDate, offset: FixedOffset) -> Option<Interval> {
    let (start_hour, end_hour) = task.best_time_to_do.hour_band()?;
    let start = NaiveTime::from_hms_opt(start_hour, 0, 0)?;
    let end = NaiveTime::from_hms_opt(end_hour, 0, 0)?;
    Some(Interval {
        start: local_instant(date, start, offset),
        end: local_instant(date, end, offset),
    })
}

/// Minutes from `start` to the band; 0 when `start` lies inside it.
fn distance_to_band(start: DateTime<Utc>, band: Interval) -> i64 {
    if start < band.start {
        (band.start - start).num_minutes()
    } else if start >= band.end {
        (start - band.end).num_minutes() + 1
    } else {
        0
    }
}

/// `window` minus every event occurrence inside it, in chronological order.
fn free_gaps(window: Interval, events: &[CalendarEvent]) -> Vec<Interval> {
    let mut busy: Vec<Interval> = events
        .iter()
        .flat_map(|event| event.occurrences_between(window.start, window.end))
        .map(|occurrence| Interval {
            start: occurrence.start.max(window.start),
            end: occurrence.end.min(window.end),
        })
        .filter(|interval| interval.end > interval.start)
        .collect();
    busy.sort_by_key(|interval| interval.start);

    let mut gaps = Vec::new();
    let mut cursor = window.start;
    for interval in busy {
        if interval.start > cursor {
            gaps.push(Interval {
                start: cursor,
                end: interval.start,
            });
        }
        cursor = cursor.max(interval.end);
    }
    if cursor < window.end {
        gaps.push(Interval {
            start: cursor,
            end: window.end,
        });
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::EventDraft;
    use crate::model::task::{BestTimeToDo, TaskCategory, TaskDraft, TaskPriority, TaskStatus};

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-10-29T08:00:00+00:00").unwrap()
    }

    fn task(minutes: u32, best: BestTimeToDo) -> Task {
        let mut draft = TaskDraft::new("Write report", TaskCategory::Work, TaskPriority::High, minutes);
        draft.best_time_to_do = best;
        Task::from_draft("task-1", draft, at("2024-10-28T08:00:00Z"))
    }

    fn morning_meeting() -> CalendarEvent {
        CalendarEvent::from_draft(
            "meeting",
            EventDraft::new(
                "Standup",
                EventType::Meeting,
                at("2024-10-29T09:00:00Z"),
                at("2024-10-29T10:00:00Z"),
            ),
        )
    }

    #[test]
    fn first_proposal_follows_existing_event() {
        let events = vec![morning_meeting()];
        let slots = suggest_time_slots(
            &task(60, BestTimeToDo::Morning),
            &events,
            &UserPreferences::default(),
            now(),
        );

        assert_eq!(slots.len(), MAX_SUGGESTIONS);
        assert_eq!(slots[0].start_time, at("2024-10-29T10:00:00Z"));
        assert_eq!(slots[0].end_time, at("2024-10-29T11:00:00Z"));
        assert_eq!(slots[1].start_time, at("2024-10-30T09:00:00Z"));
        for slot in &slots {
            assert_eq!(slot.kind, EventType::TimeBlock);
            assert_eq!(slot.linked_task_id.as_deref(), Some("task-1"));
            assert!(slot.end_time <= events[0].start_time || slot.start_time >= events[0].end_time);
        }
    }

    #[test]
    fn evening_preference_pulls_slot_to_end_of_working_day() {
        let slots = suggest_time_slots(
            &task(60, BestTimeToDo::Evening),
            &[],
            &UserPreferences::default(),
            now(),
        );

        assert_eq!(slots[0].start_time, at("2024-10-29T16:00:00Z"));
        assert_eq!(slots[0].end_time, at("2024-10-29T17:00:00Z"));
    }

    #[test]
    fn deadline_limits_candidates() {
        let mut item = task(60, BestTimeToDo::Anytime);
        item.deadline = Some(at("2024-10-29T12:00:00Z"));

        let slots = suggest_time_slots(&item, &[], &UserPreferences::default(), now());

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time, at("2024-10-29T09:00:00Z"));
    }

    #[test]
    fn closed_tasks_get_no_proposals() {
        let mut item = task(30, BestTimeToDo::Anytime);
        item.status = TaskStatus::Done;
        assert!(suggest_time_slots(&item, &[], &UserPreferences::default(), now()).is_empty());
    }

    #[test]
    fn zero_estimate_uses_minimum_slot() {
        let slots = suggest_time_slots(
            &task(0, BestTimeToDo::Anytime),
            &[],
            &UserPreferences::default(),
            now(),
        );
        assert_eq!(
            slots[0].end_time - slots[0].start_time,
            Duration::minutes(i64::from(MIN_SLOT_MINUTES))
        );
    }

    fn afternoon_preferences() -> UserPreferences {
        UserPreferences {
            preferred_working_hours: WorkingHours {
                start: "13:00".to_string(),
                end: "15:00".to_string(),
            },
            ..UserPreferences::default()
        }
    }

    fn daily_sync() -> CalendarEvent {
        let mut draft = EventDraft::new(
            "Daily sync",
            EventType::Meeting,
            at("2024-10-28T13:30:00Z"),
            at("2024-10-28T14:00:00Z"),
        );
        draft.recurrence = RecurrencePattern::Daily;
        CalendarEvent::from_draft("sync", draft)
    }

    #[test]
    fn custom_hours_and_daily_meeting_bound_every_proposal() {
        let meeting = daily_sync();
        let events = vec![meeting.clone()];
        let work_start = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
        let work_end = NaiveTime::from_hms_opt(15, 0, 0).unwrap();

        let slots = suggest_time_slots(
            &task(30, BestTimeToDo::Anytime),
            &events,
            &afternoon_preferences(),
            now(),
        );

        let starts: Vec<DateTime<Utc>> = slots.iter().map(|slot| slot.start_time).collect();
        assert_eq!(
            starts,
            vec![
                at("2024-10-29T13:00:00Z"),
                at("2024-10-29T14:00:00Z"),
                at("2024-10-30T13:00:00Z"),
            ]
        );
        for slot in &slots {
            assert!(slot.start_time.time() >= work_start);
            assert!(slot.end_time.time() <= work_end);
            assert_eq!(slot.start_time.date_naive(), slot.end_time.date_naive());
            assert!(meeting
                .occurrences_between(slot.start_time, slot.end_time)
                .is_empty());
        }

        let longer = suggest_time_slots(
            &task(45, BestTimeToDo::Anytime),
            &events,
            &afternoon_preferences(),
            now(),
        );
        let starts: Vec<DateTime<Utc>> = longer.iter().map(|slot| slot.start_time).collect();
        assert_eq!(
            starts,
            vec![
                at("2024-10-29T14:00:00Z"),
                at("2024-10-30T14:00:00Z"),
                at("2024-10-31T14:00:00Z"),
            ]
        );
    }

    #[test]
    fn daily_meeting_splits_each_day_of_the_horizon() {
        let events = vec![daily_sync()];
        let today = now().date_naive();
        let offset = *now().offset();
        let work_start = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
        let work_end = NaiveTime::from_hms_opt(15, 0, 0).unwrap();

        for day_index in 0..SUGGESTION_HORIZON_DAYS {
            let date = today.checked_add_days(Days::new(day_index)).unwrap();
            let window = Interval {
                start: local_instant(date, work_start, offset),
                end: local_instant(date, work_end, offset),
            };

            let gaps = free_gaps(window, &events);

            assert_eq!(gaps.len(), 2, "{date}");
            assert_eq!(gaps[0].start, window.start);
            assert_eq!(gaps[0].end - gaps[0].start, Duration::minutes(30));
            assert_eq!(gaps[1].end, window.end);
            assert_eq!(gaps[1].end - gaps[1].start, Duration::minutes(60));
        }
    }

    #[test]
    fn free_gaps_merge_overlapping_events() {
        let window = Interval {
            start: at("2024-10-29T09:00:00Z"),
            end: at("2024-10-29T17:00:00Z"),
        };
        let overlapping = CalendarEvent::from_draft(
            "overlap",
            EventDraft::new(
                "Review",
                EventType::Meeting,
                at("2024-10-29T09:30:00Z"),
                at("2024-10-29T11:00:00Z"),
            ),
        );

        let gaps = free_gaps(window, &[morning_meeting(), overlapping]);

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, at("2024-10-29T11:00:00Z"));
        assert_eq!(gaps[0].end, window.end);
    }
}
