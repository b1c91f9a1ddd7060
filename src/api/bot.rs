//! Bot on/off switch webhook

use crate::core::error::ServiceError;
use crate::core::schedule::BotStatus;
use crate::core::traits::BotService;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/togglebot/status", get(bot_status))
        .route("/togglebot/toggle", post(toggle_bot))
}

async fn bot_status(
    Inject(bot_service): Inject<dyn BotService>,
) -> Result<Json<BotStatus>, ServiceError> {
    bot_service.status().await.map(Json)
}

async fn toggle_bot(
    Inject(bot_service): Inject<dyn BotService>,
) -> Result<Json<BotStatus>, ServiceError> {
    bot_service.toggle().await.map(Json)
}
