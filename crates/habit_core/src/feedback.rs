use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analytics::{series_values, Analytics};
use crate::habit::Habit;
use crate::log::{LogEntry, Metric};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Same,
}

impl Trend {
    pub fn between(current: u64, previous: u64) -> Self {
        if current > previous {
            Trend::Up
        } else if current < previous {
            Trend::Down
        } else {
            Trend::Same
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Same => "same",
        };
        f.write_str(label)
    }
}

fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Volume => "reps",
        Metric::DurationMin => "min",
    }
}

/// Compares the habit's primary metric on `new_log` with `previous`. Without
/// a previous log the trend is `Same`.
pub fn momentary_trend(new_log: &LogEntry, previous: Option<&LogEntry>, habit: &Habit) -> Trend {
    let metric = habit.kind.metric();
    match previous {
        Some(previous) => Trend::between(
            u64::from(new_log.metric(metric)),
            u64::from(previous.metric(metric)),
        ),
        None => Trend::Same,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogFeedback {
    pub habit_id: String,
    pub habit_name: String,
    pub metric: Metric,
    pub current: u32,
    pub previous: Option<u32>,
    pub trend: Trend,
}

impl LogFeedback {
    pub fn new(new_log: &LogEntry, previous: Option<&LogEntry>, habit: &Habit) -> Self {
        let metric = habit.kind.metric();
        Self {
            habit_id: habit.id.clone(),
            habit_name: habit.name.clone(),
            metric,
            current: new_log.metric(metric),
            previous: previous.map(|log| log.metric(metric)),
            trend: momentary_trend(new_log, previous, habit),
        }
    }
}

pub trait FeedbackSink: Send + Sync {
    fn deliver(&self, feedback: &LogFeedback);
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowTrend {
    pub this_sum: u64,
    pub last_sum: u64,
    pub trend: Trend,
}

pub fn window_trend(series: &[u64], half_window: usize) -> WindowTrend {
    let head = &series[..half_window.min(series.len())];
    let tail = &series[series.len().saturating_sub(half_window)..];
    let this_sum: u64 = tail.iter().sum();
    let last_sum: u64 = head.iter().sum();
    WindowTrend {
        this_sum,
        last_sum,
        trend: Trend::between(this_sum, last_sum),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeaturedHabit {
    pub habit_id: String,
    pub name: String,
    pub metric: Metric,
    pub window: WindowTrend,
}

impl FeaturedHabit {
    pub fn summary(&self) -> String {
        let unit = metric_label(self.metric);
        format!(
            "{}: {} {unit} vs {} {unit} before ({})",
            self.name, self.window.this_sum, self.window.last_sum, self.window.trend
        )
    }
}

pub fn rank_featured(mut candidates: Vec<FeaturedHabit>, limit: usize) -> Vec<FeaturedHabit> {
    candidates.sort_by(|a, b| b.window.this_sum.cmp(&a.window.this_sum));
    candidates.truncate(limit);
    candidates
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportOptions {
    pub series_days: usize,
    pub featured_limit: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            series_days: 14,
            featured_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendReport {
    pub volume: WindowTrend,
    pub duration: WindowTrend,
    pub featured: Vec<FeaturedHabit>,
}

impl TrendReport {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "volume: {} vs {} ({})",
                self.volume.this_sum, self.volume.last_sum, self.volume.trend
            ),
            format!(
                "study minutes: {} vs {} ({})",
                self.duration.this_sum, self.duration.last_sum, self.duration.trend
            ),
        ];
        lines.extend(self.featured.iter().map(FeaturedHabit::summary));
        lines
    }
}

pub fn build_report(analytics: &Analytics<'_>, habits: &[Habit], options: ReportOptions) -> TrendReport {
    let days = options.series_days;
    let half = days / 2;
    let aggregate = |metric| window_trend(&series_values(&analytics.series(metric, days)), half);

    let candidates = habits
        .iter()
        .filter(|habit| habit.is_active())
        .map(|habit| {
            let metric = habit.kind.metric();
            let series = analytics.series_by_habit(&habit.id, metric, days);
            FeaturedHabit {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                metric,
                window: window_trend(&series_values(&series), half),
            }
        })
        .collect();

    TrendReport {
        volume: aggregate(Metric::Volume),
        duration: aggregate(Metric::DurationMin),
        featured: rank_featured(candidates, options.featured_limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cheat_day::CheatDayUsage;
    use crate::habit::{HabitKind, Recurrence, Targets};
    use crate::log::{InMemoryLogRepository, LogRepository, NewLog};
    use crate::time::TimeOfDay;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn burpees() -> Habit {
        Habit::new("burpees", "Burpees", HabitKind::Exercise)
            .with_targets(Targets {
                sets: Some(10),
                reps: Some(25),
                minutes: None,
            })
            .with_recurrence(Recurrence::daily())
    }

    #[test]
    fn equal_volume_is_same() {
        let habit = burpees();
        let mut repo = InMemoryLogRepository::new();
        let yesterday = repo.add(NewLog::new("burpees", date(2025, 2, 1)).sets_reps(11, 25));
        let today = repo.add(NewLog::new("burpees", date(2025, 2, 2)).sets_reps(11, 25));
        assert_eq!(today.volume, 275);

        let previous = repo.previous_for_habit(&today);
        assert_eq!(previous.as_ref().map(|l| l.id.as_str()), Some(yesterday.id.as_str()));
        assert_eq!(momentary_trend(&today, previous.as_ref(), &habit), Trend::Same);
    }

    #[test]
    fn study_habits_compare_duration() {
        let habit = Habit::new("study", "Study", HabitKind::Study);
        let mut repo = InMemoryLogRepository::new();
        let short = repo.add(
            NewLog::new("study", date(2025, 2, 1))
                .sets_reps(9, 9)
                .between(TimeOfDay::parse("19:00"), TimeOfDay::parse("20:00")),
        );
        let long = repo.add(
            NewLog::new("study", date(2025, 2, 2)).between(TimeOfDay::parse("19:00"), TimeOfDay::parse("20:30")),
        );
        assert_eq!(momentary_trend(&long, Some(&short), &habit), Trend::Up);
        assert_eq!(momentary_trend(&short, Some(&long), &habit), Trend::Down);

        let feedback = LogFeedback::new(&long, Some(&short), &habit);
        assert_eq!((feedback.current, feedback.previous), (90, Some(60)));
    }

    #[test]
    fn first_log_is_same() {
        let mut repo = InMemoryLogRepository::new();
        let first = repo.add(NewLog::new("burpees", date(2025, 2, 1)).sets_reps(5, 5));
        assert_eq!(momentary_trend(&first, None, &burpees()), Trend::Same);
        assert_eq!(LogFeedback::new(&first, None, &burpees()).previous, None);
    }

    #[test]
    fn window_trend_compares_halves() {
        let series = [1, 2, 3, 4, 5, 6];
        let trend = window_trend(&series, 3);
        assert_eq!((trend.this_sum, trend.last_sum, trend.trend), (15, 6, Trend::Up));
        assert_eq!(window_trend(&[5, 0], 1).trend, Trend::Down);
        assert_eq!(window_trend(&[2, 2], 1).trend, Trend::Same);
        let short = window_trend(&[4], 3);
        assert_eq!((short.this_sum, short.last_sum), (4, 4));
        assert_eq!(window_trend(&[], 3).trend, Trend::Same);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let featured = |id: &str, this_sum| FeaturedHabit {
            habit_id: id.into(),
            name: id.into(),
            metric: Metric::Volume,
            window: WindowTrend {
                this_sum,
                last_sum: 0,
                trend: Trend::Up,
            },
        };
        let ranked = rank_featured(
            vec![featured("a", 10), featured("b", 30), featured("c", 10), featured("d", 20)],
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|f| f.habit_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[test]
    fn report_features_busiest_habits() {
        let habits = vec![
            burpees(),
            Habit::new("study", "Study", HabitKind::Study).with_recurrence(Recurrence::daily()),
        ];
        let mut repo = InMemoryLogRepository::new();
        repo.add(NewLog::new("burpees", date(2025, 2, 1)).sets_reps(10, 25));
        repo.add(NewLog::new("burpees", date(2025, 2, 4)).sets_reps(11, 25));
        repo.add(
            NewLog::new("study", date(2025, 2, 4)).between(TimeOfDay::parse("19:00"), TimeOfDay::parse("19:45")),
        );
        let usage = CheatDayUsage::default();
        let analytics = Analytics::new(&habits, repo.entries(), &usage, date(2025, 2, 4));

        let report = build_report(
            &analytics,
            &habits,
            ReportOptions {
                series_days: 4,
                featured_limit: 1,
            },
        );
        assert_eq!((report.volume.this_sum, report.volume.last_sum), (275, 250));
        assert_eq!(report.volume.trend, Trend::Up);
        assert_eq!(report.duration.trend, Trend::Up);
        assert_eq!(report.featured.len(), 1);
        assert_eq!(report.featured[0].habit_id, "burpees");
        assert_eq!(report.lines()[2], "Burpees: 275 reps vs 250 reps before (up)");
    }
}
