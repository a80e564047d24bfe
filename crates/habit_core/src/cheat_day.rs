use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::Analytics;
use crate::error::{HabitError, Result};
use crate::time::{add_days, trailing_days};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheatDayConfig {
    pub cycle_days: u32,
    pub required_achievement_percent: u8,
    #[serde(default)]
    pub label: String,
}

impl CheatDayConfig {
    pub fn new(cycle_days: u32, required_achievement_percent: u8, label: impl Into<String>) -> Self {
        Self {
            cycle_days,
            required_achievement_percent,
            label: label.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cycle_days == 0 {
            return Err(HabitError::invalid("cycle_days", "must be at least 1"));
        }
        if self.required_achievement_percent > 100 {
            return Err(HabitError::invalid(
                "required_achievement_percent",
                format!("{} is above 100", self.required_achievement_percent),
            ));
        }
        Ok(())
    }

    pub fn required_rate(&self) -> f64 {
        f64::from(self.required_achievement_percent.min(100)) / 100.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CheatDayUsage(BTreeSet<NaiveDate>);

impl CheatDayUsage {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn record(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }

    pub fn used_between(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= end && self.0.range(start..=end).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<NaiveDate> for CheatDayUsage {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheatDayPhase {
    Locked,
    Unlocked,
    UsedThisPeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheatDayStatus {
    pub label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub cycle_achievement_rate: f64,
    pub required_rate: f64,
    pub scheduled_days: usize,
    pub used_in_period: bool,
    pub unlocked: bool,
}

impl CheatDayStatus {
    pub fn phase(&self) -> CheatDayPhase {
        if self.used_in_period {
            CheatDayPhase::UsedThisPeriod
        } else if self.unlocked {
            CheatDayPhase::Unlocked
        } else {
            CheatDayPhase::Locked
        }
    }
}

pub fn evaluate(config: &CheatDayConfig, usage: &CheatDayUsage, analytics: &Analytics<'_>) -> CheatDayStatus {
    let cycle_days = config.cycle_days.max(1) as usize;
    let period_end = analytics.today();
    let period_start = add_days(period_end, -(cycle_days as i64 - 1));

    let mut rate_sum = 0.0;
    let mut scheduled_days = 0;
    for day in trailing_days(period_end, cycle_days) {
        let summary = analytics.day_plan_summary(day);
        if summary.scheduled == 0 {
            continue;
        }
        scheduled_days += 1;
        rate_sum += summary.rate;
    }
    let cycle_achievement_rate = if scheduled_days == 0 {
        0.0
    } else {
        rate_sum / scheduled_days as f64
    };

    let required_rate = config.required_rate();
    let used_in_period = usage.used_between(period_start, period_end);
    CheatDayStatus {
        label: config.label.clone(),
        period_start,
        period_end,
        cycle_achievement_rate,
        required_rate,
        scheduled_days,
        used_in_period,
        unlocked: scheduled_days > 0 && cycle_achievement_rate >= required_rate && !used_in_period,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheatDayState {
    #[serde(default)]
    config: Option<CheatDayConfig>,
    #[serde(default)]
    usage: CheatDayUsage,
}

impl CheatDayState {
    pub fn config(&self) -> Option<&CheatDayConfig> {
        self.config.as_ref()
    }

    pub fn usage(&self) -> &CheatDayUsage {
        &self.usage
    }

    pub fn set_config(&mut self, config: CheatDayConfig) -> Result<()> {
        config.validate()?;
        self.config = Some(config);
        Ok(())
    }

    pub fn clear_config(&mut self) -> Option<CheatDayConfig> {
        self.config.take()
    }

    /// Records usage on `date` without checking eligibility. Returns false
    /// when the date was already recorded.
    pub fn use_cheat_day(&mut self, date: NaiveDate) -> bool {
        self.usage.record(date)
    }

    pub fn status(&self, analytics: &Analytics<'_>) -> Option<CheatDayStatus> {
        self.config
            .as_ref()
            .map(|config| evaluate(config, &self.usage, analytics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{Habit, HabitKind, Recurrence};
    use crate::log::{InMemoryLogRepository, LogRepository, NewLog};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekday_habits() -> Vec<Habit> {
        ["a", "b"]
            .into_iter()
            .map(|id| Habit::new(id, id, HabitKind::Exercise).with_recurrence(Recurrence::weekly([1, 2, 3, 4, 5])))
            .collect()
    }

    /// Week of Mon 2025-02-03 .. Sun 2025-02-09 with day rates
    /// [1, 1, 0.5, 1, 1] and an empty weekend.
    fn logged_week() -> InMemoryLogRepository {
        let mut repo = InMemoryLogRepository::new();
        for day in 3..=7 {
            repo.add(NewLog::new("a", date(2025, 2, day)));
            if day != 5 {
                repo.add(NewLog::new("b", date(2025, 2, day)));
            }
        }
        repo
    }

    #[test]
    fn unconfigured_state_has_no_status() {
        let habits = weekday_habits();
        let repo = logged_week();
        let state = CheatDayState::default();
        let analytics = Analytics::new(&habits, repo.entries(), state.usage(), date(2025, 2, 9));
        assert!(state.status(&analytics).is_none());
    }

    #[test]
    fn averages_only_scheduled_days() {
        let habits = weekday_habits();
        let repo = logged_week();
        let mut state = CheatDayState::default();
        state.set_config(CheatDayConfig::new(7, 80, "weekly treat")).unwrap();

        let analytics = Analytics::new(&habits, repo.entries(), state.usage(), date(2025, 2, 9));
        let status = state.status(&analytics).unwrap();
        assert_eq!(status.period_start, date(2025, 2, 3));
        assert_eq!(status.period_end, date(2025, 2, 9));
        assert_eq!(status.scheduled_days, 5);
        assert!((status.cycle_achievement_rate - 0.9).abs() < 1e-9);
        assert!(status.unlocked);
        assert_eq!(status.phase(), CheatDayPhase::Unlocked);
    }

    #[test]
    fn threshold_above_average_stays_locked() {
        let habits = weekday_habits();
        let repo = logged_week();
        let mut state = CheatDayState::default();
        state.set_config(CheatDayConfig::new(7, 95, "")).unwrap();
        let analytics = Analytics::new(&habits, repo.entries(), state.usage(), date(2025, 2, 9));
        assert_eq!(state.status(&analytics).unwrap().phase(), CheatDayPhase::Locked);
    }

    #[test]
    fn usage_inside_period_blocks_unlock() {
        let habits = weekday_habits();
        let repo = logged_week();
        let mut state = CheatDayState::default();
        state.set_config(CheatDayConfig::new(7, 80, "")).unwrap();
        assert!(state.use_cheat_day(date(2025, 2, 8)));
        assert!(!state.use_cheat_day(date(2025, 2, 8)));
        assert_eq!(state.usage().len(), 1);

        let analytics = Analytics::new(&habits, repo.entries(), state.usage(), date(2025, 2, 9));
        let status = state.status(&analytics).unwrap();
        assert!(status.used_in_period);
        assert!(!status.unlocked);
        assert_eq!(status.phase(), CheatDayPhase::UsedThisPeriod);

        // a week later the old usage has left the window
        let later = Analytics::new(&habits, repo.entries(), state.usage(), date(2025, 2, 16));
        assert!(!state.status(&later).unwrap().used_in_period);
    }

    #[test]
    fn window_without_schedules_is_locked() {
        let habits: Vec<Habit> = Vec::new();
        let repo = InMemoryLogRepository::new();
        let mut state = CheatDayState::default();
        state.set_config(CheatDayConfig::new(3, 0, "")).unwrap();
        let analytics = Analytics::new(&habits, repo.entries(), state.usage(), date(2025, 2, 9));
        let status = state.status(&analytics).unwrap();
        assert_eq!(status.cycle_achievement_rate, 0.0);
        assert!(!status.unlocked);
    }

    #[test]
    fn replacing_config_keeps_usage_and_rejects_bad_values() {
        let mut state = CheatDayState::default();
        state.use_cheat_day(date(2025, 1, 1));
        state.set_config(CheatDayConfig::new(7, 80, "first")).unwrap();
        state.set_config(CheatDayConfig::new(14, 70, "second")).unwrap();
        assert_eq!(state.config().map(|c| c.label.as_str()), Some("second"));
        assert!(state.usage().contains(date(2025, 1, 1)));

        assert!(state.set_config(CheatDayConfig::new(0, 80, "")).is_err());
        assert!(state.set_config(CheatDayConfig::new(7, 120, "")).is_err());
        assert_eq!(state.config().map(|c| c.cycle_days), Some(14));
    }
}
