//! livesub server - live resource subscriptions over WebSocket.

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livesub_server::{create_router, simulate::simulate_updates, AppState, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "livesub_server={0},livesub_core={0},tower_http=info",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.into_config();
    let listen_addr = config.listen_addr();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %listen_addr,
        scan_interval_ms = config.scan_interval.as_millis() as u64,
        simulate_interval_ms = config.simulate_interval.map(|d| d.as_millis() as u64),
        uri_prefix = %config.uri_prefix,
        "starting livesub server"
    );

    let state = AppState::start(config.clone());

    let simulator = config.simulate_interval.map(|interval| {
        tokio::spawn(simulate_updates(
            state.store.clone(),
            state.broadcast.clone(),
            interval,
        ))
    });

    let app = create_router(state.clone());
    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!("server ready, WebSocket sessions at ws://{}/ws", listen_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(simulator) = simulator {
        simulator.abort();
    }
    state.shutdown().await;

    match served {
        Ok(()) => {
            tracing::info!("server shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "server error");
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
