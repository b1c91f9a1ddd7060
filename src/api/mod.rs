use crate::core::error::ServiceError;
use crate::core::statistics::DateRange;
use async_trait::async_trait;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Query};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

pub mod bot;
pub mod chats;
pub mod mailing;
pub mod schedule;
pub mod seed;
pub mod statistics;

/// Every route the dashboard calls.
///
/// The REST part lives under `/api`, the settings screens keep the webhook paths
/// they were built against.
pub fn router() -> Router {
    Router::new()
        .route("/api", get(root))
        .route("/api/", get(root))
        .nest(
            "/api",
            Router::new()
                .merge(statistics::router())
                .merge(chats::router())
                .merge(seed::router()),
        )
        .nest(
            "/webhook/gb",
            Router::new()
                .merge(schedule::router())
                .merge(mailing::router())
                .merge(bot::router()),
        )
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Жилищный баланс - Админ панель API" }))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
            ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

// Malformed bodies and queries answer like any other invalid input.
impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::Invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::Invalid(rejection.body_text())
    }
}

impl From<MultipartRejection> for ServiceError {
    fn from(rejection: MultipartRejection) -> Self {
        ServiceError::Invalid(rejection.body_text())
    }
}

#[derive(Debug, Deserialize, Default)]
struct DateRangeParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Statistics range taken from the `start_date` / `end_date` query parameters.
///
/// Only the format is checked here. The service pins the range to the configured offset.
#[derive(Debug)]
pub struct ExtractDateRange(pub DateRange);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractDateRange
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ServiceError> {
        let Query(params) = Query::<DateRangeParams>::try_from_uri(&parts.uri)?;

        let range = DateRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;
        Ok(ExtractDateRange(range))
    }
}
