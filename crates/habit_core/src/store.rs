use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::Analytics;
use crate::cheat_day::CheatDayState;
use crate::error::Result;
use crate::habit::Habit;
use crate::log::InMemoryLogRepository;
use crate::schedule::PlanOverrides;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitStore {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub logs: InMemoryLogRepository,
    #[serde(default)]
    pub plan_overrides: PlanOverrides,
    #[serde(default)]
    pub cheat_day: CheatDayState,
}

impl HabitStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload)?;
        Ok(())
    }

    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == habit_id)
    }

    pub fn habit_mut(&mut self, habit_id: &str) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|habit| habit.id == habit_id)
    }

    pub fn analytics(&self, today: NaiveDate) -> Analytics<'_> {
        Analytics::new(&self.habits, self.logs.entries(), self.cheat_day.usage(), today)
    }
}
