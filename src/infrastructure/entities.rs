//! Database entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ChatStatus {
    Active,
    NoResponse,
    Consultation,
    IndividualConsultation,
    Blocked,
}

impl ChatStatus {
    /// Whether the dialog ended in any kind of booked consultation.
    pub fn is_conversion(self) -> bool {
        matches!(
            self,
            ChatStatus::Consultation | ChatStatus::IndividualConsultation
        )
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Chat {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_phone: String,
    pub status: ChatStatus,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub total_interactions: i64,
    pub total_tokens_used: Option<i64>,
    pub dialog_cost: Option<f64>,
}

impl Chat {
    /// Lower-cased name and phone, matched by the chat search.
    pub fn search_key(&self) -> String {
        format!("{}\n{}", self.client_name, self.client_phone).to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Sender {
    Bot,
    Client,
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub tokens_used: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DealStatus {
    ConsultationScheduled,
    IndividualConsultationScheduled,
    NoResponse,
}

#[derive(Debug, Clone, FromRow)]
pub struct Deal {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_cost: f64,
}

/// One weekday row of the bot schedule, times stored as `HH:MM`.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleDay {
    pub weekday: i64,
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct MailingSettings {
    pub mailing_time: String,
    /// JSON object keyed by English weekday name
    pub mailing_days: String,
    pub pause_between_clients: i64,
}

/// Metadata of the stored contact list; the bytes themselves are not loaded.
#[derive(Debug, Clone, FromRow)]
pub struct ContactFile {
    pub file_name: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// A new contact list to store, bytes included.
#[derive(Debug, Clone)]
pub struct ContactFileUpload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
}

/// A full replacement of the chat store, written in one transaction.
#[derive(Debug, Default)]
pub struct Dataset {
    pub chats: Vec<Chat>,
    pub messages: Vec<Message>,
    pub deals: Vec<Deal>,
}
