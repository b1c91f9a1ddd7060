//! Mailing settings: send time, weekday calendar, pause between recipients and the
//! uploaded contact list.

use crate::core::clock::{self, hhmm};
use crate::infrastructure::entities;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Allowed pause between two recipients, in seconds.
pub const PAUSE_RANGE: RangeInclusive<u32> = 1..=3600;
pub const DEFAULT_PAUSE: u32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MailingDays {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingConfig {
    #[serde(with = "hhmm")]
    pub mailing_time: NaiveTime,
    pub mailing_days: MailingDays,
    pub pause_between_clients: u32,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Default for MailingConfig {
    fn default() -> Self {
        MailingConfig {
            mailing_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            mailing_days: MailingDays::default(),
            pause_between_clients: DEFAULT_PAUSE,
            file_name: None,
            file_size: None,
            uploaded_at: None,
        }
    }
}

#[derive(Debug)]
pub struct ContactsUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Partial update as posted by the mailing screen. `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct MailingUpdate {
    pub mailing_time: Option<NaiveTime>,
    pub mailing_days: Option<MailingDays>,
    pub pause_between_clients: Option<u32>,
    pub contacts: Option<ContactsUpload>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailingError {
    #[error("pauseBetweenClients must be between 1 and 3600 seconds, got {0}")]
    PauseOutOfRange(i64),
    #[error("invalid pauseBetweenClients {0:?}, expected whole seconds")]
    InvalidPause(String),
    #[error("invalid mailingTime {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("invalid mailingDays: {0}")]
    InvalidDays(String),
    #[error("contactsFile is empty")]
    EmptyContacts,
}

impl MailingUpdate {
    pub fn parse_time(raw: &str) -> Result<NaiveTime, MailingError> {
        clock::parse(raw).ok_or_else(|| MailingError::InvalidTime(raw.to_owned()))
    }

    pub fn parse_days(raw: &str) -> Result<MailingDays, MailingError> {
        serde_json::from_str(raw).map_err(|e| MailingError::InvalidDays(e.to_string()))
    }

    pub fn parse_pause(raw: &str) -> Result<u32, MailingError> {
        let pause: i64 = raw
            .trim()
            .parse()
            .map_err(|_| MailingError::InvalidPause(raw.to_owned()))?;

        u32::try_from(pause)
            .ok()
            .filter(|p| PAUSE_RANGE.contains(p))
            .ok_or(MailingError::PauseOutOfRange(pause))
    }
}

impl MailingConfig {
    /// Applies the scalar fields of `update`; the contact file is stored by the repository.
    pub fn apply(&mut self, update: &MailingUpdate) -> Result<(), MailingError> {
        if update.contacts.as_ref().is_some_and(|c| c.content.is_empty()) {
            return Err(MailingError::EmptyContacts);
        }
        if let Some(pause) = update.pause_between_clients {
            if !PAUSE_RANGE.contains(&pause) {
                return Err(MailingError::PauseOutOfRange(pause.into()));
            }
            self.pause_between_clients = pause;
        }
        if let Some(time) = update.mailing_time {
            self.mailing_time = time;
        }
        if let Some(days) = update.mailing_days {
            self.mailing_days = days;
        }
        Ok(())
    }

    /// Rebuilds the config from stored rows; anything unreadable falls back to the
    /// default value for that field.
    pub fn from_rows(
        settings: Option<entities::MailingSettings>,
        contacts: Option<entities::ContactFile>,
    ) -> Self {
        let mut config = MailingConfig::default();

        if let Some(settings) = settings {
            if let Some(time) = clock::parse(&settings.mailing_time) {
                config.mailing_time = time;
            }
            if let Ok(days) = serde_json::from_str(&settings.mailing_days) {
                config.mailing_days = days;
            }
            if let Some(pause) = u32::try_from(settings.pause_between_clients)
                .ok()
                .filter(|p| PAUSE_RANGE.contains(p))
            {
                config.pause_between_clients = pause;
            }
        }

        if let Some(file) = contacts {
            config.file_name = Some(file.file_name);
            config.file_size = Some(file.size_bytes);
            config.uploaded_at = Some(file.uploaded_at);
        }

        config
    }

    pub fn to_settings(&self) -> Result<entities::MailingSettings, serde_json::Error> {
        Ok(entities::MailingSettings {
            mailing_time: clock::format(self.mailing_time),
            mailing_days: serde_json::to_string(&self.mailing_days)?,
            pause_between_clients: self.pause_between_clients.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MailingConfig::default();
        assert_eq!(clock::format(config.mailing_time), "09:00");
        assert_eq!(config.mailing_days, MailingDays::default());
        assert_eq!(config.pause_between_clients, 30);
        assert!(config.file_name.is_none());
    }

    #[test]
    fn test_pause_bounds() {
        assert_eq!(MailingUpdate::parse_pause("1"), Ok(1));
        assert_eq!(MailingUpdate::parse_pause("3600"), Ok(3600));
        assert_eq!(
            MailingUpdate::parse_pause("0"),
            Err(MailingError::PauseOutOfRange(0))
        );
        assert_eq!(
            MailingUpdate::parse_pause("3601"),
            Err(MailingError::PauseOutOfRange(3601))
        );
        assert_eq!(
            MailingUpdate::parse_pause("-5"),
            Err(MailingError::PauseOutOfRange(-5))
        );
        assert!(MailingUpdate::parse_pause("soon").is_err());
    }

    #[test]
    fn test_parse_days_accepts_partial_object() {
        let days = MailingUpdate::parse_days(r#"{"monday": true, "friday": true}"#).unwrap();
        assert!(days.monday);
        assert!(days.friday);
        assert!(!days.sunday);

        assert!(MailingUpdate::parse_days("monday").is_err());
    }

    #[test]
    fn test_parse_days_rejects_unknown_keys() {
        let result = MailingUpdate::parse_days(r#"{"Monday": true}"#);
        assert!(matches!(result, Err(MailingError::InvalidDays(_))));

        assert!(MailingUpdate::parse_days(r#"{"monday": true, "holiday": false}"#).is_err());
    }

    #[test]
    fn test_apply_keeps_absent_fields() {
        let mut config = MailingConfig::default();
        let update = MailingUpdate {
            pause_between_clients: Some(90),
            ..Default::default()
        };

        config.apply(&update).unwrap();

        assert_eq!(config.pause_between_clients, 90);
        assert_eq!(clock::format(config.mailing_time), "09:00");
    }

    #[test]
    fn test_apply_rejects_empty_contacts() {
        let mut config = MailingConfig::default();
        let update = MailingUpdate {
            contacts: Some(ContactsUpload {
                file_name: "contacts.csv".to_owned(),
                content: Vec::new(),
            }),
            ..Default::default()
        };

        assert_eq!(config.apply(&update), Err(MailingError::EmptyContacts));
    }

    #[test]
    fn test_settings_round_trip() {
        let mut config = MailingConfig::default();
        config.mailing_days.tuesday = true;
        config.mailing_time = clock::parse("14:45").unwrap();
        config.pause_between_clients = 120;

        let restored = MailingConfig::from_rows(Some(config.to_settings().unwrap()), None);
        assert_eq!(restored, config);
    }
}
