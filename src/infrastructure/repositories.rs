//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Chat, ContactFile, ContactFileUpload, Dataset, Deal, MailingSettings, Message, ScheduleDay,
};
use crate::infrastructure::error::RepositoryError;
use crate::infrastructure::traits::{ChatRepository, SettingsRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::info;
use uuid::Uuid;

const CHAT_COLUMNS: &str = "id, client_id, client_name, client_phone, status, started_at, last_message_at, total_interactions, total_tokens_used, dialog_cost";

#[injectable(ChatRepository)]
pub struct DbChatRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ChatRepository for DbChatRepository {
    async fn list_chats(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Chat>, RepositoryError> {
        let query = format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE (? IS NULL OR instr(search_key, ?) > 0) ORDER BY julianday(last_message_at) DESC, id ASC LIMIT ? OFFSET ?"
        );

        Ok(sqlx::query_as(&query)
            .bind(search)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&**self.connection)
            .await?)
    }

    async fn count_chats(&self, search: Option<&str>) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM chats WHERE (? IS NULL OR instr(search_key, ?) > 0)",
        )
        .bind(search)
        .bind(search)
        .fetch_one(&**self.connection)
        .await?;

        Ok(count)
    }

    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<Chat>, RepositoryError> {
        let query = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?");

        Ok(sqlx::query_as(&query)
            .bind(chat_id)
            .fetch_optional(&**self.connection)
            .await?)
    }

    async fn list_chat_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        Ok(sqlx::query_as(
            "SELECT id, chat_id, sender, text, created_at, tokens_used FROM messages WHERE chat_id = ? ORDER BY julianday(created_at) ASC, rowid ASC",
        )
        .bind(chat_id)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn chats_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Chat>, RepositoryError> {
        let query = format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE julianday(started_at) BETWEEN julianday(?) AND julianday(?)"
        );

        Ok(sqlx::query_as(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&**self.connection)
            .await?)
    }

    async fn deals_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Deal>, RepositoryError> {
        Ok(sqlx::query_as(
            "SELECT id, client_id, client_name, status, created_at, updated_at, estimated_cost FROM deals WHERE julianday(created_at) BETWEEN julianday(?) AND julianday(?)",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn replace_all(&self, dataset: Dataset) -> Result<(), RepositoryError> {
        let mut tx = self.connection.begin().await?;

        sqlx::query("DELETE FROM messages").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM chats").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM deals").execute(&mut *tx).await?;

        for chat in &dataset.chats {
            sqlx::query(
                "INSERT INTO chats (id, client_id, client_name, client_phone, search_key, status, started_at, last_message_at, total_interactions, total_tokens_used, dialog_cost) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(chat.id)
            .bind(chat.client_id)
            .bind(&chat.client_name)
            .bind(&chat.client_phone)
            .bind(chat.search_key())
            .bind(chat.status)
            .bind(chat.started_at)
            .bind(chat.last_message_at)
            .bind(chat.total_interactions)
            .bind(chat.total_tokens_used)
            .bind(chat.dialog_cost)
            .execute(&mut *tx)
            .await?;
        }

        for message in &dataset.messages {
            sqlx::query(
                "INSERT INTO messages (id, chat_id, sender, text, created_at, tokens_used) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(message.id)
            .bind(message.chat_id)
            .bind(message.sender)
            .bind(&message.text)
            .bind(message.created_at)
            .bind(message.tokens_used)
            .execute(&mut *tx)
            .await?;
        }

        for deal in &dataset.deals {
            sqlx::query(
                "INSERT INTO deals (id, client_id, client_name, status, created_at, updated_at, estimated_cost) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(deal.id)
            .bind(deal.client_id)
            .bind(&deal.client_name)
            .bind(deal.status)
            .bind(deal.created_at)
            .bind(deal.updated_at)
            .bind(deal.estimated_cost)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "replaced chat store with {} chats, {} messages, {} deals",
            dataset.chats.len(),
            dataset.messages.len(),
            dataset.deals.len()
        );

        Ok(())
    }
}

#[injectable(SettingsRepository)]
pub struct DbSettingsRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl SettingsRepository for DbSettingsRepository {
    async fn schedule_enabled(&self) -> Result<Option<bool>, RepositoryError> {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT enabled FROM schedule_settings WHERE id = 1")
                .fetch_optional(&**self.connection)
                .await?;

        Ok(row.map(|(enabled,)| enabled))
    }

    async fn schedule_days(&self) -> Result<Vec<ScheduleDay>, RepositoryError> {
        Ok(sqlx::query_as(
            "SELECT weekday, enabled, start_time, end_time FROM schedule_days ORDER BY weekday ASC",
        )
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn save_schedule(
        &self,
        enabled: bool,
        days: Vec<ScheduleDay>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.connection.begin().await?;

        sqlx::query(
            "INSERT INTO schedule_settings (id, enabled) VALUES (1, ?) ON CONFLICT (id) DO UPDATE SET enabled = excluded.enabled",
        )
        .bind(enabled)
        .execute(&mut *tx)
        .await?;

        for day in days {
            sqlx::query(
                "INSERT INTO schedule_days (weekday, enabled, start_time, end_time) VALUES (?, ?, ?, ?) ON CONFLICT (weekday) DO UPDATE SET enabled = excluded.enabled, start_time = excluded.start_time, end_time = excluded.end_time",
            )
            .bind(day.weekday)
            .bind(day.enabled)
            .bind(day.start_time)
            .bind(day.end_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn mailing_settings(&self) -> Result<Option<MailingSettings>, RepositoryError> {
        Ok(sqlx::query_as(
            "SELECT mailing_time, mailing_days, pause_between_clients FROM mailing_settings WHERE id = 1",
        )
        .fetch_optional(&**self.connection)
        .await?)
    }

    async fn contact_file(&self) -> Result<Option<ContactFile>, RepositoryError> {
        Ok(sqlx::query_as(
            "SELECT file_name, size_bytes, uploaded_at FROM contact_files WHERE id = 1",
        )
        .fetch_optional(&**self.connection)
        .await?)
    }

    async fn save_mailing(
        &self,
        settings: MailingSettings,
        contacts: Option<ContactFileUpload>,
    ) -> Result<Option<ContactFile>, RepositoryError> {
        let mut tx = self.connection.begin().await?;

        sqlx::query(
            "INSERT INTO mailing_settings (id, mailing_time, mailing_days, pause_between_clients) VALUES (1, ?, ?, ?) ON CONFLICT (id) DO UPDATE SET mailing_time = excluded.mailing_time, mailing_days = excluded.mailing_days, pause_between_clients = excluded.pause_between_clients",
        )
        .bind(settings.mailing_time)
        .bind(settings.mailing_days)
        .bind(settings.pause_between_clients)
        .execute(&mut *tx)
        .await?;

        let stored = match contacts {
            Some(upload) => {
                let size_bytes = upload.content.len() as i64;

                sqlx::query(
                    "INSERT INTO contact_files (id, file_name, size_bytes, content, uploaded_at) VALUES (1, ?, ?, ?, ?) ON CONFLICT (id) DO UPDATE SET file_name = excluded.file_name, size_bytes = excluded.size_bytes, content = excluded.content, uploaded_at = excluded.uploaded_at",
                )
                .bind(&upload.file_name)
                .bind(size_bytes)
                .bind(upload.content)
                .bind(upload.uploaded_at)
                .execute(&mut *tx)
                .await?;

                Some(ContactFile {
                    file_name: upload.file_name,
                    size_bytes,
                    uploaded_at: upload.uploaded_at,
                })
            }
            None => None,
        };

        tx.commit().await?;
        Ok(stored)
    }

    async fn bot_enabled(&self) -> Result<Option<bool>, RepositoryError> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT enabled FROM bot_settings WHERE id = 1")
            .fetch_optional(&**self.connection)
            .await?;

        Ok(row.map(|(enabled,)| enabled))
    }

    async fn set_bot_enabled(&self, enabled: bool) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO bot_settings (id, enabled) VALUES (1, ?) ON CONFLICT (id) DO UPDATE SET enabled = excluded.enabled",
        )
        .bind(enabled)
        .execute(&**self.connection)
        .await?;

        Ok(())
    }
}
