//! Convoy Orchestrator
//!
//! The deployment pipeline engine: promotes artifacts through gated
//! stages with human approvals, drives canary rollouts in production, and
//! rolls back to the last known good artifact on regression.
//!
//! Architecture:
//! - Configuration: environment-driven settings and the pipeline spec
//! - Repositories: Postgres persistence for runs, stages, last-known-good
//! - Services: gate evaluation, approvals, rollout, rollback, the
//!   orchestrator state machine
//! - Collaborators: HTTP adapters for the artifact store, scanners,
//!   cluster control plane, and notification sink
//! - Scheduler: the polling loop that advances every active run
//! - API: HTTP surface for submit/status/approve/abort

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod collab;
pub mod config;
pub mod db;
pub mod repository;
pub mod scheduler;
pub mod service;

use crate::collab::artifact::HttpArtifactStore;
use crate::collab::deployer::HttpDeployer;
use crate::collab::notifier::HttpNotifier;
use crate::collab::scanner::HttpScannerHub;
use crate::config::Config;
use crate::scheduler::RunPoller;
use crate::service::orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convoy_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Convoy Orchestrator...");

    // Load and validate configuration
    let config = Config::from_env();
    config.validate().expect("Invalid configuration");

    let spec = config
        .load_pipeline_spec()
        .expect("Failed to load pipeline spec");
    tracing::info!(
        "Pipeline spec loaded: {} stage(s): {}",
        spec.stages.len(),
        spec.stages
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Wire up collaborators
    let orchestrator = Arc::new(Orchestrator::new(
        pool,
        Arc::new(spec),
        Arc::new(HttpArtifactStore::new(&config.artifact_url)),
        Arc::new(HttpScannerHub::new(&config.scanner_url)),
        Arc::new(HttpDeployer::new(&config.cluster_url)),
        Arc::new(HttpNotifier::new(&config.notification_url)),
        config.metrics_window,
    ));

    // Start the polling loop that drives active runs
    let poller = RunPoller::new(Arc::clone(&orchestrator), config.poll_interval);
    tokio::spawn(async move {
        if let Err(e) = poller.run().await {
            tracing::error!("Poller error: {:#}", e);
        }
    });

    // Build router with all API endpoints
    let app = api::create_router(orchestrator);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
