use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    analytics::{Analytics, DaySummary, HabitRate},
    cheat_day::{CheatDayConfig, CheatDayStatus},
    error::{HabitError, Result},
    feedback::{self, FeedbackSink, LogFeedback, ReportOptions, TrendReport},
    habit::{Habit, HabitChange, NewHabit},
    log::{LogEntry, LogRepository, NewLog},
    schedule::{self, PlanWindow, TimeFilter, TodoItem},
    store::HabitStore,
    time::{self, TimeOfDay},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogOutcome {
    pub log: LogEntry,
    pub feedback: LogFeedback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToggleOutcome {
    Completed(LogOutcome),
    Uncompleted { removed: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub log_streak: u32,
    pub plan_streak: u32,
    pub comeback_count: u32,
    pub today: DaySummary,
}

pub struct HabitService {
    store: RwLock<HabitStore>,
    snapshot_path: Option<PathBuf>,
    feedback_sink: Option<Box<dyn FeedbackSink>>,
}

pub struct HabitServiceBuilder {
    store: Option<HabitStore>,
    snapshot_path: Option<PathBuf>,
    feedback_sink: Option<Box<dyn FeedbackSink>>,
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            snapshot_path: None,
            feedback_sink: None,
        }
    }

    pub fn with_store(mut self, store: HabitStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_snapshot_path(mut self, path: impl AsRef<Path>) -> Self {
        self.snapshot_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_feedback_sink(mut self, sink: Box<dyn FeedbackSink>) -> Self {
        self.feedback_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<HabitService> {
        let store = match (self.store, &self.snapshot_path) {
            (Some(store), _) => store,
            (None, Some(path)) if path.exists() => {
                let store = HabitStore::load(path)?;
                info!(
                    path = %path.display(),
                    habits = store.habits.len(),
                    logs = store.logs.len(),
                    "loaded habit snapshot"
                );
                store
            }
            (None, Some(path)) => {
                warn!(path = %path.display(), "snapshot not found, starting empty");
                HabitStore::default()
            }
            (None, None) => HabitStore::default(),
        };
        Ok(HabitService {
            store: RwLock::new(store),
            snapshot_path: self.snapshot_path,
            feedback_sink: self.feedback_sink,
        })
    }
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn snapshot(&self) -> HabitStore {
        self.store.read().clone()
    }

    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        self.store.read().save(path)?;
        info!(path = %path.display(), "saved habit snapshot");
        Ok(())
    }

    pub fn habits(&self, include_archived: bool) -> Vec<Habit> {
        self.store
            .read()
            .habits
            .iter()
            .filter(|habit| include_archived || habit.is_active())
            .cloned()
            .collect()
    }

    pub fn habit(&self, habit_id: &str) -> Result<Habit> {
        self.store
            .read()
            .habit(habit_id)
            .cloned()
            .ok_or_else(|| HabitError::UnknownHabit(habit_id.to_string()))
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn add_habit(&self, new: NewHabit, today: NaiveDate) -> Habit {
        let habit = Habit {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            kind: new.kind,
            targets: new.targets,
            archived: false,
            created_on: Some(new.created_on.unwrap_or(today)),
            priority: new.priority,
            recurrence: new.recurrence,
        };
        debug!(habit_id = %habit.id, "habit created");
        self.store.write().habits.push(habit.clone());
        habit
    }

    #[instrument(skip(self, changes))]
    pub fn update_habit(
        &self,
        habit_id: &str,
        changes: impl IntoIterator<Item = HabitChange>,
    ) -> Result<Habit> {
        let mut store = self.store.write();
        let habit = store
            .habit_mut(habit_id)
            .ok_or_else(|| HabitError::UnknownHabit(habit_id.to_string()))?;
        for change in changes {
            debug!(?change, "applying habit change");
            habit.apply(change);
        }
        Ok(habit.clone())
    }

    pub fn archive_habit(&self, habit_id: &str) -> Result<Habit> {
        self.update_habit(habit_id, [HabitChange::Archive])
    }

    #[instrument(skip(self, new), fields(habit_id = %new.habit_id, date = %new.date))]
    pub fn add_log(&self, new: NewLog) -> Result<LogOutcome> {
        let outcome = {
            let mut store = self.store.write();
            let habit = store
                .habit(&new.habit_id)
                .cloned()
                .ok_or_else(|| HabitError::UnknownHabit(new.habit_id.clone()))?;
            let log = store.logs.add(new);
            let previous = store.logs.previous_for_habit(&log);
            let feedback = LogFeedback::new(&log, previous.as_ref(), &habit);
            debug!(log_id = %log.id, trend = %feedback.trend, "log recorded");
            LogOutcome { log, feedback }
        };
        if let Some(sink) = &self.feedback_sink {
            sink.deliver(&outcome.feedback);
        }
        Ok(outcome)
    }

    pub fn logs_on(&self, date: NaiveDate) -> Vec<LogEntry> {
        self.store.read().logs.list_by_date(date)
    }

    pub fn all_logs(&self) -> Vec<LogEntry> {
        self.store.read().logs.list_all()
    }

    #[instrument(skip(self))]
    pub fn uncomplete(&self, habit_id: &str, date: NaiveDate) -> usize {
        let removed = self.store.write().logs.delete_by_habit_and_date(habit_id, date);
        debug!(removed, "logs deleted");
        removed
    }

    /// Un-completes the habit on `date` when it has logs, otherwise completes
    /// it using the habit's targets and, for timed items, the planned times.
    #[instrument(skip(self))]
    pub fn toggle_due_item(&self, habit_id: &str, date: NaiveDate) -> Result<ToggleOutcome> {
        let new_log = {
            let store = self.store.read();
            let habit = store
                .habit(habit_id)
                .ok_or_else(|| HabitError::UnknownHabit(habit_id.to_string()))?;
            if store.logs.has_log(habit_id, date) {
                None
            } else {
                let mut log = NewLog::new(habit_id, date);
                log.sets = habit.targets.sets;
                log.reps = habit.targets.reps;
                if let Some((start, end)) = habit.time_window() {
                    let window = store
                        .plan_overrides
                        .get(date, habit_id)
                        .unwrap_or(PlanWindow { start, end });
                    log.start = Some(window.start);
                    log.end = Some(window.end);
                }
                Some(log)
            }
        };
        match new_log {
            Some(log) => Ok(ToggleOutcome::Completed(self.add_log(log)?)),
            None => Ok(ToggleOutcome::Uncompleted {
                removed: self.uncomplete(habit_id, date),
            }),
        }
    }

    pub fn agenda(&self, date: NaiveDate, filter: TimeFilter) -> Vec<TodoItem> {
        let store = self.store.read();
        schedule::todays_todos(date, &store.habits, filter, Some(&store.plan_overrides))
    }

    #[instrument(skip(self))]
    pub fn set_plan_override(
        &self,
        date: NaiveDate,
        habit_id: &str,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<PlanWindow> {
        let mut store = self.store.write();
        if store.habit(habit_id).is_none() {
            return Err(HabitError::UnknownHabit(habit_id.to_string()));
        }
        let latest_start = u32::from(time::DAY_MINUTES - time::SLOT_MINUTES);
        let start = TimeOfDay::from_minutes(time::snap_floor(start.minutes()).min(latest_start));
        let window = PlanWindow {
            start,
            end: time::enforce_min_end(start, end),
        };
        store.plan_overrides.set(date, habit_id, window);
        debug!(start = %window.start, end = %window.end, "plan override stored");
        Ok(window)
    }

    pub fn clear_plan_override(&self, date: NaiveDate, habit_id: &str) -> bool {
        self.store.write().plan_overrides.clear(date, habit_id)
    }

    pub fn set_cheat_day_config(&self, config: CheatDayConfig) -> Result<()> {
        debug!(
            cycle_days = config.cycle_days,
            required = config.required_achievement_percent,
            "cheat-day config replaced"
        );
        self.store.write().cheat_day.set_config(config)
    }

    pub fn clear_cheat_day_config(&self) -> Option<CheatDayConfig> {
        self.store.write().cheat_day.clear_config()
    }

    /// Records a cheat day. Callers check [`CheatDayStatus::unlocked`] first.
    #[instrument(skip(self))]
    pub fn use_cheat_day(&self, date: NaiveDate) -> bool {
        let recorded = self.store.write().cheat_day.use_cheat_day(date);
        if !recorded {
            debug!("cheat day already recorded");
        }
        recorded
    }

    pub fn cheat_day_status(&self, today: NaiveDate) -> Option<CheatDayStatus> {
        let store = self.store.read();
        let analytics = store.analytics(today);
        store.cheat_day.status(&analytics)
    }

    pub fn with_analytics<R>(&self, today: NaiveDate, query: impl FnOnce(&Analytics<'_>) -> R) -> R {
        let store = self.store.read();
        query(&store.analytics(today))
    }

    pub fn stats(&self, today: NaiveDate) -> StatsSnapshot {
        self.with_analytics(today, |analytics| StatsSnapshot {
            log_streak: analytics.log_streak_days(),
            plan_streak: analytics.plan_streak_days(),
            comeback_count: analytics.log_comeback_count(),
            today: analytics.day_plan_summary(today),
        })
    }

    pub fn habit_rates(&self, today: NaiveDate, days: usize) -> Vec<(Habit, HabitRate)> {
        let store = self.store.read();
        let analytics = store.analytics(today);
        store
            .habits
            .iter()
            .filter(|habit| habit.is_active())
            .map(|habit| (habit.clone(), analytics.habit_achievement_rate(&habit.id, days)))
            .collect()
    }

    pub fn trend_report(&self, today: NaiveDate, options: ReportOptions) -> TrendReport {
        let store = self.store.read();
        let analytics = store.analytics(today);
        feedback::build_report(&analytics, &store.habits, options)
    }
}
