use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, RecurrenceRule};
use crate::time::{self, TimeOfDay};

/// Display slot given to habits without a configured time window. It only
/// orders the agenda and carries no real-world time meaning.
pub const UNTIMED_START: TimeOfDay = TimeOfDay::MIDNIGHT;
pub fn untimed_end() -> TimeOfDay {
    TimeOfDay::from_minutes(time::SLOT_MINUTES as u32)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    #[default]
    All,
    Timed,
    Untimed,
}

impl TimeFilter {
    fn admits(self, timed: bool) -> bool {
        match self {
            TimeFilter::All => true,
            TimeFilter::Timed => timed,
            TimeFilter::Untimed => !timed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    pub habit_id: String,
    pub title: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub priority: i32,
    pub timed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PlanOverrides(BTreeMap<NaiveDate, BTreeMap<String, PlanWindow>>);

impl PlanOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, date: NaiveDate, habit_id: impl Into<String>, window: PlanWindow) {
        self.0.entry(date).or_default().insert(habit_id.into(), window);
    }

    pub fn get(&self, date: NaiveDate, habit_id: &str) -> Option<PlanWindow> {
        self.0.get(&date).and_then(|day| day.get(habit_id)).copied()
    }

    pub fn clear(&mut self, date: NaiveDate, habit_id: &str) -> bool {
        let Some(day) = self.0.get_mut(&date) else {
            return false;
        };
        let removed = day.remove(habit_id).is_some();
        if day.is_empty() {
            self.0.remove(&date);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn is_due(date: NaiveDate, habit: &Habit) -> bool {
    let Some(recurrence) = habit.recurrence.as_ref() else {
        return false;
    };
    if !recurrence.enabled {
        return false;
    }
    match recurrence.rule.as_ref() {
        None => false,
        Some(RecurrenceRule::Daily) => true,
        Some(RecurrenceRule::Weekly { weekdays }) => {
            weekdays.contains(&time::weekday_index(date))
        }
        Some(RecurrenceRule::IntervalDays { every }) => {
            let every = (*every).max(1);
            let elapsed = time::days_between(habit.base_date(), date);
            elapsed >= 0 && elapsed % every == 0
        }
    }
}

pub fn todays_todos(
    date: NaiveDate,
    habits: &[Habit],
    filter: TimeFilter,
    overrides: Option<&PlanOverrides>,
) -> Vec<TodoItem> {
    let mut items: Vec<TodoItem> = habits
        .iter()
        .filter(|habit| habit.is_active() && is_due(date, habit))
        .filter_map(|habit| {
            let window = habit.time_window();
            let timed = window.is_some();
            if !filter.admits(timed) {
                return None;
            }
            let (start, end) = window.unwrap_or((UNTIMED_START, untimed_end()));
            Some(TodoItem {
                habit_id: habit.id.clone(),
                title: habit.name.clone(),
                start,
                end,
                priority: habit.effective_priority(),
                timed,
            })
        })
        .collect();

    items.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.start.cmp(&b.start)));

    if let Some(overrides) = overrides {
        for item in items.iter_mut().filter(|item| item.timed) {
            if let Some(window) = overrides.get(date, &item.habit_id) {
                item.start = window.start;
                item.end = window.end;
            }
        }
    }

    items
}
