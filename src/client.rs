//! Typed HTTP client for the dashboard API.
//!
//! Every endpoint has a method returning `Result<T, ClientError>`. The screens that
//! must keep rendering while the backend is down use the `*_or_fallback` variants,
//! which log the failure and hand back a fixed default instead.

use crate::api::chats::schemas::{ChatDetail, ChatList};
use crate::api::seed::GeneratedData;
use crate::core::mailing::{MailingConfig, MailingUpdate};
use crate::core::schedule::{BotStatus, ScheduleConfig};
use crate::core::statistics::{
    DEFAULT_WINDOW_DAYS, DateRange, StatisticsSnapshot, StatisticsWindow,
};
use crate::core::traits::ChatQuery;
use chrono::{Duration as ChronoDuration, Offset, Utc};
use log::error;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Malformed(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct Banner {
    message: String,
}

#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: reqwest::Client,
    base_url: String,
}

impl DashboardClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(DashboardClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn banner(&self) -> Result<String, ClientError> {
        let banner: Banner = send(self.client.get(self.url("/api/")), READ_TIMEOUT).await?;
        Ok(banner.message)
    }

    pub async fn statistics(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<StatisticsSnapshot, ClientError> {
        let mut params = Vec::new();
        if let Some(start) = start_date {
            params.push(("start_date", start));
        }
        if let Some(end) = end_date {
            params.push(("end_date", end));
        }

        let request = self.client.get(self.url("/api/statistics")).query(&params);
        send(request, READ_TIMEOUT).await
    }

    pub async fn list_chats(&self, query: &ChatQuery) -> Result<ChatList, ClientError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = query.offset {
            params.push(("offset", offset.to_string()));
        }

        let request = self.client.get(self.url("/api/chats")).query(&params);
        send(request, READ_TIMEOUT).await
    }

    pub async fn chat_detail(&self, chat_id: Uuid) -> Result<ChatDetail, ClientError> {
        let request = self.client.get(self.url(&format!("/api/chats/{chat_id}")));
        send(request, READ_TIMEOUT).await
    }

    pub async fn generate_test_data(&self) -> Result<GeneratedData, ClientError> {
        let request = self.client.post(self.url("/api/generate-test-data"));
        send(request, UPLOAD_TIMEOUT).await
    }

    pub async fn schedule(&self) -> Result<ScheduleConfig, ClientError> {
        send(self.client.get(self.url("/webhook/gb/schedule")), READ_TIMEOUT).await
    }

    pub async fn save_schedule(
        &self,
        config: &ScheduleConfig,
    ) -> Result<ScheduleConfig, ClientError> {
        let request = self
            .client
            .post(self.url("/webhook/gb/schedule"))
            .json(config);
        send(request, READ_TIMEOUT).await
    }

    pub async fn mailing_config(&self) -> Result<MailingConfig, ClientError> {
        let request = self.client.get(self.url("/webhook/gb/mailing/config"));
        send(request, READ_TIMEOUT).await
    }

    /// Posts the mailing form. Fields left as `None` are not sent.
    pub async fn save_mailing_config(
        &self,
        update: MailingUpdate,
    ) -> Result<MailingConfig, ClientError> {
        let mut form = Form::new();
        if let Some(time) = update.mailing_time {
            form = form.text("mailingTime", time.format("%H:%M").to_string());
        }
        if let Some(days) = update.mailing_days {
            let days = serde_json::to_string(&days)
                .map_err(|e| ClientError::Malformed(e.to_string()))?;
            form = form.text("mailingDays", days);
        }
        if let Some(pause) = update.pause_between_clients {
            form = form.text("pauseBetweenClients", pause.to_string());
        }
        if let Some(contacts) = update.contacts {
            let part = Part::bytes(contacts.content).file_name(contacts.file_name);
            form = form.part("contactsFile", part);
        }

        let request = self
            .client
            .post(self.url("/webhook/gb/mailing/config"))
            .multipart(form);
        send(request, UPLOAD_TIMEOUT).await
    }

    pub async fn bot_status(&self) -> Result<BotStatus, ClientError> {
        let request = self.client.get(self.url("/webhook/gb/togglebot/status"));
        send(request, READ_TIMEOUT).await
    }

    pub async fn toggle_bot(&self) -> Result<BotStatus, ClientError> {
        let request = self.client.post(self.url("/webhook/gb/togglebot/toggle"));
        send(request, READ_TIMEOUT).await
    }

    /// Statistics, or an all-zero snapshot for the requested window.
    pub async fn statistics_or_fallback(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> StatisticsSnapshot {
        match self.statistics(start_date, end_date).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("failed to load statistics: {e}");
                let now = Utc::now();
                let window = DateRange::parse(start_date, end_date)
                    .and_then(|range| StatisticsWindow::resolve(range, now, Utc.fix()))
                    .unwrap_or(StatisticsWindow {
                        start: now - ChronoDuration::days(DEFAULT_WINDOW_DAYS),
                        end: now,
                    });
                StatisticsSnapshot::empty(window)
            }
        }
    }

    pub async fn list_chats_or_fallback(&self, query: &ChatQuery) -> ChatList {
        self.list_chats(query).await.unwrap_or_else(|e| {
            error!("failed to load chats: {e}");
            ChatList::default()
        })
    }

    pub async fn schedule_or_fallback(&self) -> ScheduleConfig {
        self.schedule().await.unwrap_or_else(|e| {
            error!("failed to load schedule: {e}");
            ScheduleConfig::default()
        })
    }

    pub async fn mailing_config_or_fallback(&self) -> MailingConfig {
        self.mailing_config().await.unwrap_or_else(|e| {
            error!("failed to load mailing config: {e}");
            MailingConfig::default()
        })
    }
}

async fn send<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<T, ClientError> {
    let response = request.timeout(timeout).send().await?;
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status(status.as_u16()));
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Malformed(e.to_string()))
}
