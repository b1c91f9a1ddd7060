//! Bot schedule webhook

use crate::core::error::ServiceError;
use crate::core::schedule::ScheduleConfig;
use crate::core::traits::ScheduleService;
use axum::extract::rejection::JsonRejection;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/schedule", get(get_schedule).post(save_schedule))
}

async fn get_schedule(
    Inject(schedule_service): Inject<dyn ScheduleService>,
) -> Result<Json<ScheduleConfig>, ServiceError> {
    schedule_service.get_schedule().await.map(Json)
}

async fn save_schedule(
    Inject(schedule_service): Inject<dyn ScheduleService>,
    payload: Result<Json<ScheduleConfig>, JsonRejection>,
) -> Result<Json<ScheduleConfig>, ServiceError> {
    let Json(config) = payload?;
    schedule_service.save_schedule(config).await.map(Json)
}
