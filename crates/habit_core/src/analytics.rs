use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cheat_day::CheatDayUsage;
use crate::habit::Habit;
use crate::log::{LogEntry, Metric};
use crate::schedule::{self, TimeFilter};
use crate::time::{add_days, trailing_days};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub scheduled: usize,
    pub completed: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitRate {
    pub habit_id: String,
    pub scheduled_days: usize,
    pub completed_days: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: u64,
}

pub fn series_values(points: &[SeriesPoint]) -> Vec<u64> {
    points.iter().map(|point| point.value).collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

pub struct Analytics<'a> {
    habits: &'a [Habit],
    cheat_days: &'a CheatDayUsage,
    today: NaiveDate,
    by_date: HashMap<NaiveDate, Vec<&'a LogEntry>>,
}

impl<'a> Analytics<'a> {
    pub fn new(
        habits: &'a [Habit],
        logs: &'a [LogEntry],
        cheat_days: &'a CheatDayUsage,
        today: NaiveDate,
    ) -> Self {
        let mut by_date: HashMap<NaiveDate, Vec<&'a LogEntry>> = HashMap::new();
        for log in logs {
            by_date.entry(log.date).or_default().push(log);
        }
        Self {
            habits,
            cheat_days,
            today,
            by_date,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    fn logs_on(&self, date: NaiveDate) -> &[&'a LogEntry] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    fn has_log(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.logs_on(date).iter().any(|log| log.habit_id == habit_id)
    }

    fn is_active_day(&self, date: NaiveDate) -> bool {
        !self.logs_on(date).is_empty() || self.cheat_days.contains(date)
    }

    pub fn day_plan_summary(&self, date: NaiveDate) -> DaySummary {
        let due = schedule::todays_todos(date, self.habits, TimeFilter::All, None);
        let completed_ids: HashSet<&str> = self
            .logs_on(date)
            .iter()
            .map(|log| log.habit_id.as_str())
            .collect();
        let completed = due
            .iter()
            .filter(|item| completed_ids.contains(item.habit_id.as_str()))
            .count();
        DaySummary {
            date,
            scheduled: due.len(),
            completed,
            rate: ratio(completed, due.len()),
        }
    }

    pub fn log_streak_days(&self) -> u32 {
        let mut streak = 0;
        let mut day = self.today;
        while self.is_active_day(day) {
            streak += 1;
            day = add_days(day, -1);
        }
        streak
    }

    /// Consecutive fully completed days ending today. Days with nothing
    /// scheduled are passed over; a cheat day always counts.
    pub fn plan_streak_days(&self) -> u32 {
        let Some(floor) = self.earliest_relevant_date() else {
            return 0;
        };
        let mut streak = 0;
        let mut day = self.today;
        // Before `floor` there are no logs or cheat days, so any scheduled day
        // would end the streak and unscheduled ones would skip forever.
        while day >= floor {
            if self.cheat_days.contains(day) {
                streak += 1;
            } else {
                let summary = self.day_plan_summary(day);
                if summary.scheduled > 0 {
                    if summary.rate < 1.0 {
                        break;
                    }
                    streak += 1;
                }
            }
            day = add_days(day, -1);
        }
        streak
    }

    fn earliest_relevant_date(&self) -> Option<NaiveDate> {
        let habit_dates = self.habits.iter().map(Habit::base_date);
        let log_dates = self.by_date.keys().copied();
        habit_dates
            .chain(log_dates)
            .chain(self.cheat_days.iter())
            .min()
    }

    pub fn log_comeback_count(&self) -> u32 {
        let first = self
            .by_date
            .keys()
            .copied()
            .chain(self.cheat_days.iter())
            .filter(|date| *date <= self.today)
            .min();
        let Some(mut day) = first else {
            return 0;
        };
        let mut comebacks = 0;
        let mut previous_active = self.is_active_day(add_days(day, -1));
        while day <= self.today {
            let active = self.is_active_day(day);
            if active && !previous_active {
                comebacks += 1;
            }
            previous_active = active;
            day = add_days(day, 1);
        }
        comebacks
    }

    pub fn habit_achievement_rate(&self, habit_id: &str, days: usize) -> HabitRate {
        let mut scheduled_days = 0;
        let mut completed_days = 0;
        if let Some(habit) = self.habits.iter().find(|habit| habit.id == habit_id) {
            for day in trailing_days(self.today, days) {
                if !schedule::is_due(day, habit) {
                    continue;
                }
                scheduled_days += 1;
                if self.has_log(habit_id, day) {
                    completed_days += 1;
                }
            }
        }
        HabitRate {
            habit_id: habit_id.to_string(),
            scheduled_days,
            completed_days,
            rate: ratio(completed_days, scheduled_days),
        }
    }

    pub fn daily_achievement_rates(&self, days: usize) -> Vec<DaySummary> {
        trailing_days(self.today, days)
            .rev()
            .map(|day| self.day_plan_summary(day))
            .collect()
    }

    pub fn series(&self, metric: Metric, days: usize) -> Vec<SeriesPoint> {
        self.collect_series(days, metric, None)
    }

    pub fn series_by_habit(&self, habit_id: &str, metric: Metric, days: usize) -> Vec<SeriesPoint> {
        self.collect_series(days, metric, Some(habit_id))
    }

    fn collect_series(
        &self,
        days: usize,
        metric: Metric,
        habit_id: Option<&str>,
    ) -> Vec<SeriesPoint> {
        trailing_days(self.today, days)
            .map(|date| {
                let value = self
                    .logs_on(date)
                    .iter()
                    .filter(|log| habit_id.map_or(true, |id| log.habit_id == id))
                    .map(|log| u64::from(log.metric(metric)))
                    .sum();
                SeriesPoint { date, value }
            })
            .collect()
    }
}
