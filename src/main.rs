use std::sync::Arc;

use oracle_registry::api::router::create_router;
use oracle_registry::config::AppConfig;
use oracle_registry::registry::{load_snapshot, RegistryState, SystemClock};
use oracle_registry::services::notifier::{run_event_forwarder, WebhookNotifier};
use oracle_registry::services::persister::SnapshotWriter;
use oracle_registry::{metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = metrics::init_metrics()?;

    // --- Registry state: restore from disk or start empty ---
    let restored = match &config.state_file {
        Some(path) => load_snapshot(path)?,
        None => None,
    };
    let registry_state = match restored {
        Some(state) => {
            tracing::info!(
                markets = state.market_count,
                events = state.journal.len(),
                owner = %state.owner,
                "Registry restored from snapshot"
            );
            state
        }
        None => {
            tracing::info!(
                owner = %config.owner,
                resolver = %config.resolver,
                fee = %config.creation_fee,
                "Starting empty registry"
            );
            RegistryState::new(
                config.owner.clone(),
                config.resolver.clone(),
                config.creation_fee,
            )?
        }
    };

    let state = AppState::build(
        config.clone(),
        registry_state,
        Arc::new(SystemClock::new()),
        metrics_handle,
    );

    // --- Event delivery: optional indexer webhook ---
    if let Some(url) = config.event_webhook_url.clone() {
        let rx = state.events_tx.subscribe();
        tokio::spawn(async move {
            run_event_forwarder(rx, WebhookNotifier::new(url)).await;
        });
    } else {
        tracing::info!("EVENT_WEBHOOK_URL not set, events served over /ws and /api/events only");
    }

    // --- Persistence: snapshot after every committed mutation ---
    let snapshot_writer = config
        .state_file
        .clone()
        .map(|path| SnapshotWriter::new(state.registry.clone(), path));
    match &snapshot_writer {
        Some(writer) => {
            tokio::spawn(writer.clone().run(state.events_tx.subscribe()));
        }
        None => tracing::warn!("STATE_FILE not set, registry state lives in memory only"),
    }

    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = &snapshot_writer {
        writer.persist().await?;
        tracing::info!("Final registry snapshot written");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
