//! Statistics endpoint

use crate::api::ExtractDateRange;
use crate::core::error::ServiceError;
use crate::core::statistics::StatisticsSnapshot;
use crate::core::traits::StatisticsService;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/statistics", get(get_statistics))
}

async fn get_statistics(
    Inject(statistics_service): Inject<dyn StatisticsService>,
    ExtractDateRange(range): ExtractDateRange,
) -> Result<Json<StatisticsSnapshot>, ServiceError> {
    statistics_service.statistics(range).await.map(Json)
}
