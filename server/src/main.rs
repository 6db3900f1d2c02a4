//! Catalog Sync Server - reconciles CRM events into the CMS catalog.
//!
//! The CRM posts change signals to a webhook. Each accepted signal becomes one
//! reconciliation run on its own task: the event is fetched fresh from the
//! CRM, compared with the CMS, and the CMS is brought in line using the
//! decisions of catalog-sync-engine.

mod auth;
mod cms;
mod config;
mod crm;
mod db;
mod error;
mod handlers;
mod lock;
mod routes;
mod sync;

#[cfg(test)]
mod testing;

use crate::cms::{CmsApi, HttpTransport, RateLimitedClient, TokioSleeper};
use crate::config::Config;
use crate::crm::CrmClient;
use crate::lock::{MemoryCreateLock, PgCreateLock};
use crate::sync::{Collections, JobSender, Reconciler};
use axum::Router;
use catalog_sync_engine::RetryPolicy;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Queue of reconciliation jobs, drained by the sync worker
    pub jobs: JobSender,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_sync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Catalog Sync Server on {}:{}",
        config.host,
        config.port
    );
    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET is not set, webhook endpoints are unauthenticated");
    }

    // Build the CMS and CRM clients
    let transport = HttpTransport::new(
        &config.cms.base_url,
        config.cms.api_token.clone(),
        config.cms.timeout,
    )?;
    let client = RateLimitedClient::new(
        transport,
        TokioSleeper,
        RetryPolicy::new(config.cms.max_attempts),
        config.cms.request_delay,
    );
    let api = CmsApi::new(client);
    let crm = CrmClient::new(&config.crm)?;
    let collections = Collections::from(&config.cms);

    // Start the sync worker on the configured create-lock store
    let (jobs, queue) = sync::job_queue();
    match &config.database_url {
        Some(database_url) => {
            let pool = db::create_pool(database_url).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            let lock = PgCreateLock::new(pool);
            let reconciler = Reconciler::new(api, crm, lock, collections, config.create_lock_ttl);
            tokio::spawn(sync::run_worker(Arc::new(reconciler), queue));
        }
        None => {
            tracing::warn!(
                "DATABASE_URL is not set, creates are only serialised within this instance"
            );
            let lock = MemoryCreateLock::new();
            let reconciler = Reconciler::new(api, crm, lock, collections, config.create_lock_ttl);
            tokio::spawn(sync::run_worker(Arc::new(reconciler), queue));
        }
    }

    // Build application state
    let state = AppState {
        config: Arc::new(config.clone()),
        jobs,
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
