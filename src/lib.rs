//! Admin backend for the housing-balance sales bot - library exports for testing

pub mod api;
pub mod client;
pub mod config;
pub mod core;
pub mod infrastructure;

use crate::config::AppConfig;
use crate::core::services::{
    DbBotService, DbChatService, DbMailingService, DbScheduleService, DbStatisticsService,
    DbTestDataService,
};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::repositories::{DbChatRepository, DbSettingsRepository};
use di::{Injectable, Ref, ServiceCollection};

/// Registers every service the router resolves.
pub fn services(config: AppConfig) -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services
        .add(di::singleton_factory(move |_| Ref::new(config.clone())))
        .add(DatabaseConnection::singleton())
        .add(DbChatRepository::scoped())
        .add(DbSettingsRepository::scoped())
        .add(DbStatisticsService::scoped())
        .add(DbChatService::scoped())
        .add(DbScheduleService::scoped())
        .add(DbMailingService::scoped())
        .add(DbBotService::scoped())
        .add(DbTestDataService::scoped());
    services
}
