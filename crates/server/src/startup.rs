use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StorageConfig};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

use crate::metrics;
use crate::routes::{self, AppState, RouterOptions};
use service::{runtime, JsonFileStore, WriteMode};

/// Open the file-backed record store described by `cfg`, seeding an empty
/// roster when configured and no document exists yet.
pub async fn open_store(cfg: &StorageConfig) -> anyhow::Result<Arc<JsonFileStore>> {
    let mode = match cfg.write_mode {
        configs::WriteMode::Atomic => WriteMode::Atomic,
        configs::WriteMode::InPlace => WriteMode::InPlace,
    };
    let store = JsonFileStore::with_options(&cfg.data_file, mode, cfg.pretty).await?;
    if cfg.seed_if_missing && store.seed_if_missing(&json!({"students": []})).await? {
        info!(event = "seeded", path = %cfg.data_file, "created empty roster document");
    }
    Ok(store)
}

/// Build the router for a loaded configuration.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    runtime::ensure_env(&cfg.storage.frontend_dir, &cfg.storage.data_file).await?;
    let store = open_store(&cfg.storage).await?;
    metrics::init();
    let state = AppState::new(store);
    Ok(routes::build_router(state, &RouterOptions::from(cfg), routes::build_cors()))
}

/// Public entry: build the app and serve it until `shutdown` resolves.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(&cfg).await?;

    let addr: SocketAddr = cfg.server.bind_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        data_file = %cfg.storage.data_file,
        write_mode = ?cfg.storage.write_mode,
        api_prefix = %cfg.server.api_prefix,
        "roster server listening"
    );
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
