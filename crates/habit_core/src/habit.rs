use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::log::Metric;
use crate::time::TimeOfDay;

pub const DEFAULT_PRIORITY: i32 = 99;

pub fn interval_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum HabitKind {
    #[default]
    Exercise,
    Study,
}

impl HabitKind {
    pub fn metric(self) -> Metric {
        match self {
            HabitKind::Exercise => Metric::Volume,
            HabitKind::Study => Metric::DurationMin,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Targets {
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceRule {
    Daily,
    /// Weekday numbers, 0 = Sunday .. 6 = Saturday.
    Weekly { weekdays: BTreeSet<u8> },
    /// Due every `every` days counting from the habit's base date.
    IntervalDays { every: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    pub enabled: bool,
    pub rule: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeOfDay>,
}

impl Recurrence {
    fn enabled_with(rule: RecurrenceRule) -> Self {
        Self {
            enabled: true,
            rule: Some(rule),
            start: None,
            end: None,
        }
    }

    pub fn daily() -> Self {
        Self::enabled_with(RecurrenceRule::Daily)
    }

    pub fn weekly(weekdays: impl IntoIterator<Item = u8>) -> Self {
        Self::enabled_with(RecurrenceRule::Weekly {
            weekdays: weekdays.into_iter().collect(),
        })
    }

    pub fn every_n_days(every: i64) -> Self {
        Self::enabled_with(RecurrenceRule::IntervalDays { every })
    }

    pub fn at(mut self, start: TimeOfDay, end: TimeOfDay) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn time_window(&self) -> Option<(TimeOfDay, TimeOfDay)> {
        Some((self.start?, self.end?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: HabitKind,
    #[serde(default)]
    pub targets: Targets,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_on: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

impl Habit {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: HabitKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            targets: Targets::default(),
            archived: false,
            created_on: None,
            priority: None,
            recurrence: None,
        }
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_created_on(mut self, date: NaiveDate) -> Self {
        self.created_on = Some(date);
        self
    }

    pub fn with_targets(mut self, targets: Targets) -> Self {
        self.targets = targets;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.archived
    }

    pub fn base_date(&self) -> NaiveDate {
        self.created_on.unwrap_or_else(interval_epoch)
    }

    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn time_window(&self) -> Option<(TimeOfDay, TimeOfDay)> {
        self.recurrence.as_ref().and_then(Recurrence::time_window)
    }

    pub fn apply(&mut self, change: HabitChange) {
        match change {
            HabitChange::Rename(name) => self.name = name,
            HabitChange::SetKind(kind) => self.kind = kind,
            HabitChange::SetTargets(targets) => self.targets = targets,
            HabitChange::SetRecurrence(recurrence) => self.recurrence = recurrence,
            HabitChange::SetPriority(priority) => self.priority = priority,
            HabitChange::Archive => self.archived = true,
            HabitChange::Restore => self.archived = false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub kind: HabitKind,
    #[serde(default)]
    pub targets: Targets,
    #[serde(default)]
    pub created_on: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "change", content = "value", rename_all = "snake_case")]
pub enum HabitChange {
    Rename(String),
    SetKind(HabitKind),
    SetTargets(Targets),
    SetRecurrence(Option<Recurrence>),
    SetPriority(Option<i32>),
    Archive,
    Restore,
}
