//! Chat browser endpoints

use crate::api::chats::schemas::{ChatDetail, ChatList, ChatListParams};
use crate::core::error::ServiceError;
use crate::core::traits::{ChatQuery, ChatService};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/chats", get(list_chats))
        .route("/chats/:id", get(chat_detail))
}

async fn list_chats(
    Inject(chat_service): Inject<dyn ChatService>,
    query: Result<Query<ChatListParams>, QueryRejection>,
) -> Result<Json<ChatList>, ServiceError> {
    let Query(params) = query?;
    let page = chat_service
        .list_chats(ChatQuery {
            search: params.search,
            limit: params.limit,
            offset: params.offset,
        })
        .await?;

    Ok(Json(ChatList {
        chats: page.chats.into_iter().map(schemas::ChatSummary::from).collect(),
        total: page.total,
    }))
}

async fn chat_detail(
    Inject(chat_service): Inject<dyn ChatService>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatDetail>, ServiceError> {
    // an id that cannot be a chat id names no chat
    let chat_id = Uuid::parse_str(&chat_id)
        .map_err(|_| ServiceError::NotFound("Chat not found".to_owned()))?;
    let transcript = chat_service.chat_detail(chat_id).await?;

    Ok(Json(ChatDetail {
        chat: transcript.chat.into(),
        messages: transcript
            .messages
            .into_iter()
            .map(schemas::Message::from)
            .collect(),
    }))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use crate::infrastructure::entities::{ChatStatus, Sender};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug, Default)]
    pub struct ChatListParams {
        pub search: Option<String>,
        pub limit: Option<i64>,
        pub offset: Option<i64>,
    }

    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct ChatSummary {
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

    impl From<entities::Chat> for ChatSummary {
        fn from(chat: entities::Chat) -> Self {
            ChatSummary {
                id: chat.id,
                client_id: chat.client_id,
                client_name: chat.client_name,
                client_phone: chat.client_phone,
                status: chat.status,
                started_at: chat.started_at,
                last_message_at: chat.last_message_at,
                total_interactions: chat.total_interactions,
                total_tokens_used: chat.total_tokens_used,
                dialog_cost: chat.dialog_cost,
            }
        }
    }

    #[derive(Serialize, Deserialize, Debug, Default)]
    pub struct ChatList {
        pub chats: Vec<ChatSummary>,
        pub total: i64,
    }

    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct Message {
        pub id: Uuid,
        pub chat_id: Uuid,
        pub sender: Sender,
        pub message: String,
        pub timestamp: DateTime<Utc>,
        pub tokens_used: Option<i64>,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            Message {
                id: message.id,
                chat_id: message.chat_id,
                sender: message.sender,
                message: message.text,
                timestamp: message.created_at,
                tokens_used: message.tokens_used,
            }
        }
    }

    /// Chat summary fields plus the full transcript.
    #[derive(Serialize, Deserialize, Debug)]
    pub struct ChatDetail {
        #[serde(flatten)]
        pub chat: ChatSummary,
        pub messages: Vec<Message>,
    }
}
