use std::fmt;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HabitError, Result};

pub const SLOT_MINUTES: u16 = 15;
pub const DAY_MINUTES: u16 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(DAY_MINUTES);

    pub fn from_minutes(minutes: u32) -> Self {
        Self(minutes.min(DAY_MINUTES as u32) as u16)
    }

    pub fn from_hm(hours: u32, minutes: u32) -> Self {
        Self::from_minutes(hours.saturating_mul(60).saturating_add(minutes))
    }

    /// Lenient `HH:MM` parser. Components that are not numbers count as zero,
    /// so garbage input yields midnight instead of an error.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let (hours, minutes) = trimmed.split_once(':').unwrap_or((trimmed, "0"));
        let hours = hours.trim().parse::<u32>().unwrap_or(0);
        let minutes = minutes.trim().parse::<u32>().unwrap_or(0);
        Self::from_hm(hours, minutes)
    }

    pub fn minutes(self) -> u32 {
        self.0 as u32
    }

    pub fn is_end_of_day(self) -> bool {
        self.0 == DAY_MINUTES
    }

    pub fn minutes_until(self, end: TimeOfDay) -> u32 {
        end.minutes().saturating_sub(self.minutes())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TimeOfDay::parse(&raw))
    }
}

pub fn snap_nearest(minutes: u32) -> u32 {
    let slot = SLOT_MINUTES as u32;
    (((minutes + slot / 2) / slot) * slot).min(DAY_MINUTES as u32)
}

pub fn snap_floor(minutes: u32) -> u32 {
    let slot = SLOT_MINUTES as u32;
    ((minutes / slot) * slot).min(DAY_MINUTES as u32)
}

fn snap_ceil(minutes: u32) -> u32 {
    let slot = SLOT_MINUTES as u32;
    (minutes.div_ceil(slot) * slot).min(DAY_MINUTES as u32)
}

/// Keeps an interval at least one slot long. An `end` earlier than
/// `start + 15min` is pushed to the next slot boundary at or after that point,
/// capped at `24:00`.
pub fn enforce_min_end(start: TimeOfDay, end: TimeOfDay) -> TimeOfDay {
    let floor = start.minutes() + SLOT_MINUTES as u32;
    if end.minutes() < floor {
        TimeOfDay::from_minutes(snap_ceil(floor))
    } else {
        end
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| HabitError::InvalidDate(input.trim().to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

/// Month arithmetic that clamps to the last valid day (Jan 31 + 1 month is
/// Feb 28/29). Out-of-range results leave the date unchanged.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn trailing_days(today: NaiveDate, days: usize) -> impl DoubleEndedIterator<Item = NaiveDate> {
    let span = days as i64;
    (0..span).map(move |offset| add_days(today, offset - span + 1))
}
