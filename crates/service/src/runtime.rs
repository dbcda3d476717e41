//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so binary crates can call
//! `service::runtime::ensure_env` with the store's data file path.

use std::path::Path;

/// Ensure the frontend directory is present (warn only) and the data file's
/// parent directory exists.
pub async fn ensure_env(frontend_dir: &str, data_file: &str) -> anyhow::Result<()> {
    let data_dir = Path::new(data_file)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());
    common::env::ensure_env(frontend_dir, &data_dir).await
}
