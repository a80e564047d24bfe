use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use habit_core::{
    time::{days_between, format_date, parse_date, shift_months},
    CheatDayPhase, HabitService, ReportOptions, TimeFilter,
};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub(crate) data_file: PathBuf,
    pub(crate) today: Option<NaiveDate>,
    pub(crate) rate_days: usize,
    pub(crate) report: ReportOptions,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Builds a config from `HABIT_*` variables; unparsable values keep the
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("HABIT_DATA_FILE") {
            if !path.trim().is_empty() {
                config.data_file = PathBuf::from(path.trim());
            }
        }
        if let Some(raw) = lookup("HABIT_TODAY") {
            match parse_date(&raw) {
                Ok(date) => config.today = Some(date),
                Err(err) => warn!(%err, "ignoring HABIT_TODAY"),
            }
        }
        if let Some(value) = positive(lookup("HABIT_SERIES_DAYS")) {
            config.report.series_days = value;
        }
        if let Some(value) = positive(lookup("HABIT_FEATURED_LIMIT")) {
            config.report.featured_limit = value;
        }
        if let Some(value) = positive(lookup("HABIT_RATE_DAYS")) {
            config.rate_days = value;
        }
        config
    }

    /// The configured override, or the local calendar date.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

fn positive(raw: Option<String>) -> Option<usize> {
    raw?.trim().parse::<usize>().ok().filter(|value| *value > 0)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("habits.json"),
            today: None,
            rate_days: 30,
            report: ReportOptions::default(),
        }
    }
}

/// Text report of everything the engine says about `today`.
pub fn render(service: &HabitService, config: &AppConfig, today: NaiveDate) -> Vec<String> {
    let mut out = vec![format!("Agenda for {}", format_date(today))];
    for item in service.agenda(today, TimeFilter::Timed) {
        out.push(format!("  {}-{}  {}", item.start, item.end, item.title));
    }
    for item in service.agenda(today, TimeFilter::Untimed) {
        out.push(format!("  anytime      {}", item.title));
    }

    let stats = service.stats(today);
    out.push(format!(
        "Today: {}/{} done ({:.0}%)",
        stats.today.completed,
        stats.today.scheduled,
        stats.today.rate * 100.0
    ));
    out.push(format!(
        "Streaks: {} logged days, {} planned days, {} comebacks",
        stats.log_streak, stats.plan_streak, stats.comeback_count
    ));

    let month_days = days_between(shift_months(today, -1), today).max(0) as usize;
    let month = service.with_analytics(today, |analytics| analytics.daily_achievement_rates(month_days));
    let planned: Vec<_> = month.iter().filter(|day| day.scheduled > 0).collect();
    let perfect = planned.iter().filter(|day| day.rate >= 1.0).count();
    out.push(format!(
        "Past month: {perfect} of {} planned days fully done",
        planned.len()
    ));

    for (habit, rate) in service.habit_rates(today, config.rate_days) {
        out.push(format!(
            "  {}: {}/{} over {} days ({:.0}%)",
            habit.name,
            rate.completed_days,
            rate.scheduled_days,
            config.rate_days,
            rate.rate * 100.0
        ));
    }

    match service.cheat_day_status(today) {
        None => out.push("Cheat day: not configured".to_string()),
        Some(status) => {
            let phase = match status.phase() {
                CheatDayPhase::Locked => "locked",
                CheatDayPhase::Unlocked => "unlocked",
                CheatDayPhase::UsedThisPeriod => "already used this period",
            };
            out.push(format!(
                "Cheat day ({}): {phase}, {:.0}% of {:.0}% needed since {}",
                status.label,
                status.cycle_achievement_rate * 100.0,
                status.required_rate * 100.0,
                format_date(status.period_start)
            ));
        }
    }

    out.push("Trends:".to_string());
    out.extend(
        service
            .trend_report(today, config.report)
            .lines()
            .into_iter()
            .map(|line| format!("  {line}")),
    );
    out
}

pub fn run(config: AppConfig) -> Result<()> {
    let today = config.today();
    info!(path = %config.data_file.display(), %today, "starting habit agenda");
    let service = HabitService::builder()
        .with_snapshot_path(&config.data_file)
        .build()
        .with_context(|| format!("loading {}", config.data_file.display()))?;
    debug!(habits = service.habits(true).len(), "service ready");

    for line in render(&service, &config, today) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::{NewHabit, NewLog, Recurrence, TimeOfDay};
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_overrides_and_ignores_bad_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HABIT_DATA_FILE", "/tmp/me.json"),
            ("HABIT_TODAY", "2025-02-04"),
            ("HABIT_SERIES_DAYS", "28"),
            ("HABIT_FEATURED_LIMIT", "zero"),
            ("HABIT_RATE_DAYS", "0"),
        ]));
        assert_eq!(config.data_file, PathBuf::from("/tmp/me.json"));
        assert_eq!(config.today(), NaiveDate::from_ymd_opt(2025, 2, 4).unwrap());
        assert_eq!(config.report.series_days, 28);
        assert_eq!(config.report.featured_limit, 3);
        assert_eq!(config.rate_days, 30);

        let fallback = AppConfig::from_lookup(lookup(&[("HABIT_TODAY", "tomorrow")]));
        assert_eq!(fallback, AppConfig::default());
    }

    #[test]
    fn renders_agenda_and_stats() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 4).unwrap();
        let service = HabitService::builder().build().unwrap();
        let study = service.add_habit(
            NewHabit {
                name: "Study".into(),
                recurrence: Some(Recurrence::daily().at(TimeOfDay::parse("19:00"), TimeOfDay::parse("20:00"))),
                ..NewHabit::default()
            },
            today,
        );
        service.add_habit(
            NewHabit {
                name: "Burpees".into(),
                recurrence: Some(Recurrence::daily()),
                ..NewHabit::default()
            },
            today,
        );
        service.add_log(NewLog::new(&study.id, today)).unwrap();

        let lines = render(&service, &AppConfig::default(), today);
        assert_eq!(lines[0], "Agenda for 2025-02-04");
        assert_eq!(lines[1], "  19:00-20:00  Study");
        assert_eq!(lines[2], "  anytime      Burpees");
        assert!(lines.contains(&"Today: 1/2 done (50%)".to_string()));
        assert!(lines.contains(&"Cheat day: not configured".to_string()));
        assert!(lines.iter().any(|line| line.starts_with("Streaks: 1 logged days")));
    }
}
