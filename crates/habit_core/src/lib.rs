//! Habit scheduling and analytics engine.

pub mod analytics;
pub mod cheat_day;
pub mod error;
pub mod feedback;
pub mod habit;
pub mod log;
pub mod schedule;
pub mod service;
pub mod store;
pub mod time;

pub use crate::analytics::{Analytics, DaySummary, HabitRate, SeriesPoint};
pub use crate::cheat_day::{CheatDayConfig, CheatDayPhase, CheatDayState, CheatDayStatus, CheatDayUsage};
pub use crate::error::{HabitError, Result};
pub use crate::feedback::{FeedbackSink, LogFeedback, ReportOptions, Trend, TrendReport, WindowTrend};
pub use crate::habit::{Habit, HabitChange, HabitKind, NewHabit, Recurrence, RecurrenceRule, Targets};
pub use crate::log::{InMemoryLogRepository, LogEntry, LogRepository, Metric, NewLog};
pub use crate::schedule::{PlanOverrides, PlanWindow, TimeFilter, TodoItem};
pub use crate::service::{HabitService, HabitServiceBuilder, LogOutcome, StatsSnapshot, ToggleOutcome};
pub use crate::store::HabitStore;
pub use crate::time::TimeOfDay;
