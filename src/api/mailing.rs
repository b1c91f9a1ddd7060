//! Mailing settings webhook
//!
//! Saving is a multipart form: `mailingTime`, `mailingDays` (JSON object),
//! `pauseBetweenClients` and an optional `contactsFile`.

use crate::core::error::ServiceError;
use crate::core::mailing::{ContactsUpload, MailingConfig, MailingUpdate};
use crate::core::traits::MailingService;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use log::debug;

const DEFAULT_CONTACTS_FILE_NAME: &str = "contacts.csv";

pub fn router() -> Router {
    Router::new().route(
        "/mailing/config",
        get(get_mailing_config).post(save_mailing_config),
    )
}

async fn get_mailing_config(
    Inject(mailing_service): Inject<dyn MailingService>,
) -> Result<Json<MailingConfig>, ServiceError> {
    mailing_service.get_mailing_config().await.map(Json)
}

async fn save_mailing_config(
    Inject(mailing_service): Inject<dyn MailingService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MailingConfig>, ServiceError> {
    let update = read_update(multipart?).await?;
    mailing_service.save_mailing_config(update).await.map(Json)
}

async fn read_update(mut multipart: Multipart) -> Result<MailingUpdate, ServiceError> {
    let mut update = MailingUpdate::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_owned();

        match name.as_str() {
            "mailingTime" => {
                let raw = field.text().await.map_err(invalid_form)?;
                update.mailing_time = Some(MailingUpdate::parse_time(&raw)?);
            }
            "mailingDays" => {
                let raw = field.text().await.map_err(invalid_form)?;
                update.mailing_days = Some(MailingUpdate::parse_days(&raw)?);
            }
            "pauseBetweenClients" => {
                let raw = field.text().await.map_err(invalid_form)?;
                update.pause_between_clients = Some(MailingUpdate::parse_pause(&raw)?);
            }
            "contactsFile" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(DEFAULT_CONTACTS_FILE_NAME)
                    .to_owned();
                let content = field.bytes().await.map_err(invalid_form)?;
                update.contacts = Some(ContactsUpload {
                    file_name,
                    content: content.to_vec(),
                });
            }
            _ => debug!("ignoring mailing form field {name:?}"),
        }
    }

    Ok(update)
}

fn invalid_form(e: MultipartError) -> ServiceError {
    ServiceError::Invalid(e.body_text())
}
