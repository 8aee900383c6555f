use habit_grid::{
    identity::{AnonymousIdentity, DisabledIdentity, IdentityProvider},
    store::{DocumentStore, LocalStore},
    AppState, Config,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let layout = config.load_layout().await?;

    let store: Arc<dyn DocumentStore> = match &config.data_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            info!("storing tracker documents in {}", path.display());
            Arc::new(LocalStore::open(path.clone()).await)
        }
        None => {
            warn!("APP_DATA_PATH is :memory:; documents are lost on restart");
            Arc::new(LocalStore::in_memory())
        }
    };

    let identity: Arc<dyn IdentityProvider> = if config.anonymous_auth {
        Arc::new(AnonymousIdentity)
    } else {
        warn!("anonymous sign-in disabled; tracker runs without persistence");
        Arc::new(DisabledIdentity)
    };

    let state = AppState::new(config.tracker_id(), layout, store, identity);
    let app = habit_grid::router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.close_all().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
