//! DI "Interfaces"

use crate::core::error::ServiceError;
use crate::core::mailing::{MailingConfig, MailingUpdate};
use crate::core::schedule::{BotStatus, ScheduleConfig};
use crate::core::statistics::{DateRange, StatisticsSnapshot};
use crate::infrastructure::entities;
use async_trait::async_trait;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Search and pagination for the chat browser.
#[derive(Debug, Clone, Default)]
pub struct ChatQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ChatQuery {
    /// Lower-cased search term, `None` when blank.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug)]
pub struct ChatPage {
    pub chats: Vec<entities::Chat>,
    /// Number of chats matching the search, independent of the page
    pub total: i64,
}

#[derive(Debug)]
pub struct ChatTranscript {
    pub chat: entities::Chat,
    pub messages: Vec<entities::Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub chats: usize,
    pub deals: usize,
}

#[async_trait]
pub trait StatisticsService: Send + Sync {
    /// Aggregates chats and deals inside `range`, read in the configured offset.
    ///
    /// An empty window yields an all-zero snapshot. A reversed range is `Invalid`.
    async fn statistics(&self, range: DateRange) -> Result<StatisticsSnapshot, ServiceError>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    async fn list_chats(&self, query: ChatQuery) -> Result<ChatPage, ServiceError>;

    /// Returns `ServiceError::NotFound` if the chat does not exist.
    async fn chat_detail(&self, chat_id: Uuid) -> Result<ChatTranscript, ServiceError>;
}

#[async_trait]
pub trait ScheduleService: Send + Sync {
    /// Stored schedule with every weekday present, or the default week.
    async fn get_schedule(&self) -> Result<ScheduleConfig, ServiceError>;

    /// Validates, completes and persists `config`, returning what was stored.
    async fn save_schedule(&self, config: ScheduleConfig) -> Result<ScheduleConfig, ServiceError>;
}

#[async_trait]
pub trait MailingService: Send + Sync {
    async fn get_mailing_config(&self) -> Result<MailingConfig, ServiceError>;

    /// Merges `update` into the stored config. Fields left out keep their value.
    async fn save_mailing_config(
        &self,
        update: MailingUpdate,
    ) -> Result<MailingConfig, ServiceError>;
}

#[async_trait]
pub trait BotService: Send + Sync {
    async fn status(&self) -> Result<BotStatus, ServiceError>;

    /// Flips the manual switch and returns the resulting status.
    async fn toggle(&self) -> Result<BotStatus, ServiceError>;
}

#[async_trait]
pub trait TestDataService: Send + Sync {
    /// Replaces all chats, messages and deals with a random demonstration set.
    async fn generate_test_data(&self) -> Result<SeedSummary, ServiceError>;
}
