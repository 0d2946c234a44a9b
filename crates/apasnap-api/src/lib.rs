pub mod app;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use apasnap_core::GalleryConfig;

use crate::app::build_app;
use crate::state::AppState;

pub async fn serve(addr: SocketAddr, config: GalleryConfig) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_state(addr, AppState::from_config(config)?, shutdown_signal()).await
}

pub async fn serve_with_state(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let sweeper = state
        .session_idle()
        .map(|idle| tokio::spawn(sweep_idle_sessions(state.clone(), idle)));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    served?;
    Ok(())
}

/// Periodically drops sessions no client has touched within `idle`.
async fn sweep_idle_sessions(state: AppState, idle: Duration) {
    let period = (idle / 4).max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let evicted = state.evict_idle(chrono::Utc::now());
        if evicted > 0 {
            tracing::info!(evicted, remaining = state.sessions.len(), "Evicted idle sessions");
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
}
