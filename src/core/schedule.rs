//! Weekly bot schedule.
//!
//! Weekdays are numbered 0..=6 starting from Sunday, the same numbering the
//! dashboard uses for its schedule keys.

use crate::core::clock::{self, hhmm};
use crate::infrastructure::entities;
use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const WEEKDAYS: std::ops::RangeInclusive<u8> = 0..=6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub enabled: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl DaySchedule {
    /// Monday to Friday 09:00–18:00, weekends off.
    pub fn default_for(weekday: u8) -> Self {
        DaySchedule {
            enabled: (1..=5).contains(&weekday),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }

    /// Both ends of the window are inclusive.
    pub fn covers(&self, time: NaiveTime) -> bool {
        self.enabled && self.start_time <= time && time <= self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    #[serde(default)]
    pub schedule_enabled: bool,
    #[serde(default)]
    pub schedule: BTreeMap<u8, DaySchedule>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            schedule_enabled: false,
            schedule: WEEKDAYS.map(|d| (d, DaySchedule::default_for(d))).collect(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("weekday {0} is out of range, expected 0..=6")]
    UnknownWeekday(u8),
    #[error("weekday {weekday}: start time is after end time")]
    EmptyWindow { weekday: u8 },
}

impl ScheduleConfig {
    /// Fills every missing weekday with its default.
    pub fn complete(mut self) -> Self {
        for day in WEEKDAYS {
            self.schedule
                .entry(day)
                .or_insert_with(|| DaySchedule::default_for(day));
        }
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        for (&weekday, day) in &self.schedule {
            if !WEEKDAYS.contains(&weekday) {
                return Err(ScheduleError::UnknownWeekday(weekday));
            }
            if day.start_time > day.end_time {
                return Err(ScheduleError::EmptyWindow { weekday });
            }
        }
        Ok(())
    }

    pub fn is_active_at(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.schedule_enabled
            && self
                .schedule
                .get(&weekday_number(weekday))
                .is_some_and(|day| day.covers(time))
    }

    /// Rebuilds a config from stored rows; rows that fail to parse are replaced
    /// by the default for that day.
    pub fn from_rows(enabled: bool, rows: Vec<entities::ScheduleDay>) -> Self {
        let schedule = rows
            .into_iter()
            .filter_map(|row| {
                let weekday = u8::try_from(row.weekday).ok()?;
                let start_time = clock::parse(&row.start_time)?;
                let end_time = clock::parse(&row.end_time)?;
                Some((
                    weekday,
                    DaySchedule {
                        enabled: row.enabled,
                        start_time,
                        end_time,
                    },
                ))
            })
            .collect();

        ScheduleConfig {
            schedule_enabled: enabled,
            schedule,
        }
        .complete()
    }

    pub fn to_rows(&self) -> Vec<entities::ScheduleDay> {
        self.schedule
            .iter()
            .map(|(&weekday, day)| entities::ScheduleDay {
                weekday: weekday.into(),
                enabled: day.enabled,
                start_time: clock::format(day.start_time),
                end_time: clock::format(day.end_time),
            })
            .collect()
    }
}

pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// State of the bot switch together with what the schedule says right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    /// Manual switch
    pub bot_enabled: bool,
    pub schedule_enabled: bool,
    /// The schedule covers the current local time
    pub should_be_active: bool,
    /// Whether the bot is answering: switched on, and inside the schedule when
    /// the schedule is in use
    pub active: bool,
    pub weekday: u8,
    #[serde(with = "hhmm")]
    pub current_time: NaiveTime,
}

impl BotStatus {
    pub fn evaluate<Tz: TimeZone>(
        bot_enabled: bool,
        schedule: &ScheduleConfig,
        now: &DateTime<Tz>,
    ) -> Self {
        let weekday = now.weekday();
        let time = now.time();
        let should_be_active = schedule.is_active_at(weekday, time);

        BotStatus {
            bot_enabled,
            schedule_enabled: schedule.schedule_enabled,
            should_be_active,
            active: bot_enabled && (!schedule.schedule_enabled || should_be_active),
            weekday: weekday_number(weekday),
            current_time: time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time),
        }
    }
}
