//! Main Entrypoint for the Memora API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the in-memory backends and the voice pipeline.
//! 3. Draining spoken commands into the log and activity feed.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use memora_api::{
    config::Config,
    memory::{ActivityFeed, MemoryStore, Outbox, RosterMatcher},
    router::create_router,
    scheduler,
    state::AppState,
};
use memora_core::{
    Command,
    notify::{ActivityEvent, ActivityKind, ActivityLog},
    pipeline::{Contacts, Pipeline},
    session::SessionService,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize In-Memory Backends ---
    let activity = Arc::new(ActivityFeed::new());
    let store = Arc::new(MemoryStore::new(activity.clone()));
    let outbox = Arc::new(Outbox::new(activity.clone()));
    let roster = Arc::new(RosterMatcher::seeded());

    // --- 4. Initialize the Pipeline ---
    // Spoken lines have no TTS here; they land in the log and activity feed.
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
    let drain_activity = activity.clone();
    tokio::spawn(async move {
        while let Some(Command::SpeakText(text)) = command_rx.recv().await {
            info!(%text, "Speaking");
            if let Err(err) = drain_activity
                .append(ActivityEvent::new(
                    "🗣️",
                    "Assistant spoke",
                    text,
                    ActivityKind::Interaction,
                ))
                .await
            {
                warn!(error = %err, "Failed to record spoken line");
            }
        }
    });

    let session = SessionService::new(Some(command_tx))
        .with_escalation_after(Duration::from_secs(config.escalation_secs));
    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        outbox.clone(),
        activity.clone(),
        roster.clone(),
        session,
        Contacts {
            caregiver_email: config.caregiver_email.clone(),
            family_email: config.primary_family_email.clone(),
        },
    ));

    let app_state = Arc::new(AppState {
        pipeline,
        store,
        outbox,
        activity,
        roster,
        config: Arc::new(config.clone()),
    });

    // --- 5. Start the Due-Reminder Scheduler ---
    let scheduler_handle = scheduler::spawn(app_state.clone());

    // --- 6. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 7. Start Server ---
    info!(
        bind_address = %config.bind_address,
        escalation_secs = config.escalation_secs,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler_handle.abort();
    info!("Server has shut down.");
    Ok(())
}
