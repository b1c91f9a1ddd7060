//! Admin backend for the housing-balance sales bot
//!
//! Serves the dashboard REST API, the bot settings webhooks and, when configured,
//! the built dashboard bundle.

use housing_balance_admin::api;
use housing_balance_admin::config::{AppConfig, CorsOrigins};
use housing_balance_admin::core::traits::TestDataService;
use housing_balance_admin::infrastructure::database::DatabaseConnection;

use anyhow::anyhow;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use di::ServiceProvider;
use di_axum::RouterServiceProviderExtensions;
use log::{info, warn};
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::load();
    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task(config))
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
    let provider = housing_balance_admin::services(config.clone())
        .build_provider()
        .map_err(|e| anyhow!("invalid service registration: {e}"))?;

    provider
        .get_required::<DatabaseConnection>()
        .migrate()
        .await?;

    if config.seed_on_startup {
        seed_test_data(&provider).await?;
    }

    let mut app = api::router();
    if let Some(dir) = &config.static_dir {
        info!("serving dashboard bundle from {dir}");
        app = app.fallback_service(ServiceBuilder::new().service(ServeDir::new(dir)));
    }

    let app = app
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}

async fn seed_test_data(provider: &ServiceProvider) -> anyhow::Result<()> {
    let scope = provider.create_scope();
    let summary = scope
        .get_required::<dyn TestDataService>()
        .generate_test_data()
        .await?;
    info!(
        "seeded {} chats and {} deals on startup",
        summary.chats, summary.deals
    );
    Ok(())
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST]);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("ignoring invalid CORS origin {origin:?}");
                        None
                    }
                })
                .collect();
            layer.allow_origin(parsed)
        }
    }
}
