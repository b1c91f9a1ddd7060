//! Demo data endpoint

use crate::core::error::ServiceError;
use crate::core::traits::TestDataService;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use serde::{Deserialize, Serialize};

pub fn router() -> Router {
    Router::new().route("/generate-test-data", post(generate_test_data))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GeneratedData {
    pub message: String,
    pub chats: usize,
    pub deals: usize,
}

async fn generate_test_data(
    Inject(test_data_service): Inject<dyn TestDataService>,
) -> Result<Json<GeneratedData>, ServiceError> {
    let summary = test_data_service.generate_test_data().await?;

    Ok(Json(GeneratedData {
        message: "Test data generated successfully".to_owned(),
        chats: summary.chats,
        deals: summary.deals,
    }))
}
