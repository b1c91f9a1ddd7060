//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use crate::infrastructure::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Page of chats matching `search`, newest last message first.
    ///
    /// `search` must already be lower-cased.
    async fn list_chats(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<entities::Chat>, RepositoryError>;

    async fn count_chats(&self, search: Option<&str>) -> Result<i64, RepositoryError>;

    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<entities::Chat>, RepositoryError>;

    async fn list_chat_messages(
        &self,
        chat_id: Uuid,
    ) -> Result<Vec<entities::Message>, RepositoryError>;

    /// Chats whose dialog started inside the inclusive range.
    async fn chats_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<entities::Chat>, RepositoryError>;

    /// Deals created inside the inclusive range.
    async fn deals_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<entities::Deal>, RepositoryError>;

    /// Drops every chat, message and deal and inserts `dataset` instead.
    async fn replace_all(&self, dataset: entities::Dataset) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// `None` when the schedule has never been saved.
    async fn schedule_enabled(&self) -> Result<Option<bool>, RepositoryError>;

    async fn schedule_days(&self) -> Result<Vec<entities::ScheduleDay>, RepositoryError>;

    async fn save_schedule(
        &self,
        enabled: bool,
        days: Vec<entities::ScheduleDay>,
    ) -> Result<(), RepositoryError>;

    async fn mailing_settings(
        &self,
    ) -> Result<Option<entities::MailingSettings>, RepositoryError>;

    async fn contact_file(&self) -> Result<Option<entities::ContactFile>, RepositoryError>;

    /// Stores the settings and, if given, the new contact list in one transaction.
    ///
    /// Returns the metadata of the stored list.
    async fn save_mailing(
        &self,
        settings: entities::MailingSettings,
        contacts: Option<entities::ContactFileUpload>,
    ) -> Result<Option<entities::ContactFile>, RepositoryError>;

    /// `None` when the switch has never been flipped.
    async fn bot_enabled(&self) -> Result<Option<bool>, RepositoryError>;

    async fn set_bot_enabled(&self, enabled: bool) -> Result<(), RepositoryError>;
}
