//! `HH:MM` wall-clock times as used by the schedule and mailing screens.

use chrono::NaiveTime;

const FORMAT: &str = "%H:%M";

pub fn parse(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), FORMAT).ok()
}

pub fn format(time: NaiveTime) -> String {
    time.format(FORMAT).to_string()
}

/// `#[serde(with = "hhmm")]` for `NaiveTime` fields.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time {raw:?}, expected HH:MM")))
    }
}
