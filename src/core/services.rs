//! Implementations for the service the app needs.
//!

use crate::config::AppConfig;
use crate::core::error::ServiceError;
use crate::core::mailing::{MailingConfig, MailingUpdate};
use crate::core::schedule::{BotStatus, ScheduleConfig};
use crate::core::seed;
use crate::core::statistics::{self, DateRange, StatisticsSnapshot, StatisticsWindow};
use crate::core::traits::{
    BotService, ChatPage, ChatQuery, ChatService, ChatTranscript, MailingService,
    ScheduleService, SeedSummary, StatisticsService, TestDataService,
};
use crate::infrastructure::entities::ContactFileUpload;
use crate::infrastructure::error::RepositoryError;
use crate::infrastructure::traits::{ChatRepository, SettingsRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

/// Logs a repository failure at the point it is caught.
fn logged(context: &'static str) -> impl Fn(RepositoryError) -> ServiceError {
    move |e| {
        error!("{context}: {e}");
        ServiceError::Repository(e)
    }
}

#[injectable(StatisticsService)]
pub struct DbStatisticsService {
    repo: Ref<dyn ChatRepository>,
    config: Ref<AppConfig>,
}

#[async_trait]
impl StatisticsService for DbStatisticsService {
    async fn statistics(&self, range: DateRange) -> Result<StatisticsSnapshot, ServiceError> {
        let window = StatisticsWindow::resolve(range, Utc::now(), self.config.utc_offset)?;

        let deals = self
            .repo
            .deals_created_between(window.start, window.end)
            .await
            .map_err(logged("loading deals for statistics"))?;
        let chats = self
            .repo
            .chats_started_between(window.start, window.end)
            .await
            .map_err(logged("loading chats for statistics"))?;

        Ok(statistics::aggregate(
            window,
            self.config.utc_offset,
            &chats,
            &deals,
        ))
    }
}

#[injectable(ChatService)]
pub struct DbChatService {
    repo: Ref<dyn ChatRepository>,
}

#[async_trait]
impl ChatService for DbChatService {
    async fn list_chats(&self, query: ChatQuery) -> Result<ChatPage, ServiceError> {
        let needle = query.needle();

        let total = self
            .repo
            .count_chats(needle.as_deref())
            .await
            .map_err(logged("counting chats"))?;
        let chats = self
            .repo
            .list_chats(needle.as_deref(), query.limit(), query.offset())
            .await
            .map_err(logged("listing chats"))?;

        Ok(ChatPage { chats, total })
    }

    async fn chat_detail(&self, chat_id: Uuid) -> Result<ChatTranscript, ServiceError> {
        let chat = self
            .repo
            .get_chat(chat_id)
            .await
            .map_err(logged("loading chat"))?
            .ok_or_else(|| ServiceError::NotFound("Chat not found".to_owned()))?;

        let messages = self
            .repo
            .list_chat_messages(chat_id)
            .await
            .map_err(logged("loading chat messages"))?;

        Ok(ChatTranscript { chat, messages })
    }
}

#[injectable(ScheduleService)]
pub struct DbScheduleService {
    repo: Ref<dyn SettingsRepository>,
}

#[async_trait]
impl ScheduleService for DbScheduleService {
    async fn get_schedule(&self) -> Result<ScheduleConfig, ServiceError> {
        load_schedule(&*self.repo).await
    }

    async fn save_schedule(&self, config: ScheduleConfig) -> Result<ScheduleConfig, ServiceError> {
        config.validate()?;
        let config = config.complete();

        self.repo
            .save_schedule(config.schedule_enabled, config.to_rows())
            .await
            .map_err(logged("saving schedule"))?;

        info!("schedule saved, enabled = {}", config.schedule_enabled);
        Ok(config)
    }
}

async fn load_schedule(repo: &dyn SettingsRepository) -> Result<ScheduleConfig, ServiceError> {
    let Some(enabled) = repo
        .schedule_enabled()
        .await
        .map_err(logged("loading schedule"))?
    else {
        return Ok(ScheduleConfig::default());
    };

    let days = repo
        .schedule_days()
        .await
        .map_err(logged("loading schedule days"))?;

    Ok(ScheduleConfig::from_rows(enabled, days))
}

#[injectable(MailingService)]
pub struct DbMailingService {
    repo: Ref<dyn SettingsRepository>,
}

impl DbMailingService {
    async fn load(&self) -> Result<MailingConfig, ServiceError> {
        let settings = self
            .repo
            .mailing_settings()
            .await
            .map_err(logged("loading mailing settings"))?;
        let contacts = self
            .repo
            .contact_file()
            .await
            .map_err(logged("loading contact file"))?;

        Ok(MailingConfig::from_rows(settings, contacts))
    }
}

#[async_trait]
impl MailingService for DbMailingService {
    async fn get_mailing_config(&self) -> Result<MailingConfig, ServiceError> {
        self.load().await
    }

    async fn save_mailing_config(
        &self,
        update: MailingUpdate,
    ) -> Result<MailingConfig, ServiceError> {
        let mut config = self.load().await?;
        config.apply(&update)?;

        let settings = config
            .to_settings()
            .map_err(|e| logged("encoding mailing days")(e.into()))?;
        let contacts = update.contacts.map(|upload| ContactFileUpload {
            file_name: upload.file_name,
            content: upload.content,
            uploaded_at: Utc::now(),
        });

        let stored = self
            .repo
            .save_mailing(settings, contacts)
            .await
            .map_err(logged("saving mailing settings"))?;

        if let Some(stored) = stored {
            info!(
                "contact list {} uploaded ({} bytes)",
                stored.file_name, stored.size_bytes
            );
            config.file_name = Some(stored.file_name);
            config.file_size = Some(stored.size_bytes);
            config.uploaded_at = Some(stored.uploaded_at);
        }

        Ok(config)
    }
}

#[injectable(BotService)]
pub struct DbBotService {
    repo: Ref<dyn SettingsRepository>,
    config: Ref<AppConfig>,
}

impl DbBotService {
    async fn evaluate(&self, bot_enabled: bool) -> Result<BotStatus, ServiceError> {
        let schedule = load_schedule(&*self.repo).await?;
        let now = Utc::now().with_timezone(&self.config.utc_offset);

        Ok(BotStatus::evaluate(bot_enabled, &schedule, &now))
    }

    async fn bot_enabled(&self) -> Result<bool, ServiceError> {
        Ok(self
            .repo
            .bot_enabled()
            .await
            .map_err(logged("loading bot switch"))?
            .unwrap_or(true))
    }
}

#[async_trait]
impl BotService for DbBotService {
    async fn status(&self) -> Result<BotStatus, ServiceError> {
        let enabled = self.bot_enabled().await?;
        self.evaluate(enabled).await
    }

    async fn toggle(&self) -> Result<BotStatus, ServiceError> {
        let enabled = !self.bot_enabled().await?;
        self.repo
            .set_bot_enabled(enabled)
            .await
            .map_err(logged("saving bot switch"))?;

        info!("bot switched {}", if enabled { "on" } else { "off" });
        self.evaluate(enabled).await
    }
}

#[injectable(TestDataService)]
pub struct DbTestDataService {
    repo: Ref<dyn ChatRepository>,
}

#[async_trait]
impl TestDataService for DbTestDataService {
    async fn generate_test_data(&self) -> Result<SeedSummary, ServiceError> {
        let dataset = seed::generate_dataset(&mut StdRng::from_entropy(), Utc::now());
        let summary = SeedSummary {
            chats: dataset.chats.len(),
            deals: dataset.deals.len(),
        };

        self.repo
            .replace_all(dataset)
            .await
            .map_err(logged("storing test data"))?;

        info!(
            "generated {} chats and {} deals",
            summary.chats, summary.deals
        );
        Ok(summary)
    }
}
