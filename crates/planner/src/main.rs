use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;

use planner::config::{PlannerConfig, CONFIG_PATH_VAR};
use planner::server::create_router;
use planner::types::AppState;
use planner::{fetcher, logging};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_VAR).ok())
        .map(PathBuf::from);

    let config = PlannerConfig::resolve(config_path.as_deref())?;
    logging::init(&config.log_level);

    let state = Arc::new(AppState::new(config.clone()).context("Failed to build API client")?);

    // Warm the index cache; the service still starts if the API is down.
    match fetcher::fetch_bootstrap(&state.client).await {
        Ok(bootstrap) => info!(
            semesters = bootstrap.semesters.len(),
            subjects = bootstrap.subjects.len(),
            latest = ?bootstrap.latest_semester().map(|s| (s.year, s.term)),
            "Loaded course index"
        ),
        Err(e) => tracing::warn!("Could not load course index: {}", e),
    }

    let app = create_router(state);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
