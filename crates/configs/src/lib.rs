use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: None,
            api_prefix: default_api_prefix(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// How the record store overwrites its backing file.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Write a sibling temp file, then rename it over the target.
    #[default]
    Atomic,
    /// Truncate and rewrite the target file directly.
    InPlace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
    #[serde(default)]
    pub write_mode: WriteMode,
    #[serde(default)]
    pub pretty: bool,
    #[serde(default = "default_seed_if_missing")]
    pub seed_if_missing: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            frontend_dir: default_frontend_dir(),
            write_mode: WriteMode::default(),
            pretty: false,
            seed_if_missing: default_seed_if_missing(),
        }
    }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 3000 }
fn default_api_prefix() -> String { "/api".into() }
fn default_max_body_bytes() -> usize { 2 * 1024 * 1024 }
fn default_data_file() -> String { "data/students.json".into() }
fn default_frontend_dir() -> String { "frontend".into() }
fn default_seed_if_missing() -> bool { true }

/// `CONFIG_PATH` if set, otherwise `config.toml` in the working directory.
pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), fall back to defaults when the
    /// file is absent, then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = config_path();
        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(content) => parse(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
            Err(e) => return Err(anyhow!("cannot read {path}: {e}")),
        };
        cfg.apply_env_with(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Override selected fields from environment-style lookups.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(file) = lookup("ROSTER_DATA_FILE") {
            self.storage.data_file = file;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        let prefix = self.api_prefix.trim().trim_end_matches('/');
        if !prefix.starts_with('/') {
            return Err(anyhow!("server.api_prefix must start with '/'"));
        }
        self.api_prefix = prefix.to_string();
        if self.max_body_bytes == 0 {
            return Err(anyhow!("server.max_body_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.data_file.trim().is_empty() {
            return Err(anyhow!("storage.data_file is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        let mut cfg = parse("")?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.api_prefix, "/api");
        assert_eq!(cfg.storage.data_file, "data/students.json");
        assert_eq!(cfg.storage.write_mode, WriteMode::Atomic);
        assert!(cfg.storage.seed_if_missing);
        Ok(())
    }

    #[test]
    fn parses_sections() -> Result<()> {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8088
            worker_threads = 2

            [storage]
            data_file = "/var/lib/roster/students.json"
            write_mode = "in_place"
            pretty = true
            seed_if_missing = false
            "#,
        )?;
        assert_eq!(cfg.server.bind_addr(), "0.0.0.0:8088");
        assert_eq!(cfg.server.worker_threads, Some(2));
        assert_eq!(cfg.storage.write_mode, WriteMode::InPlace);
        assert!(cfg.storage.pretty);
        assert!(!cfg.storage.seed_if_missing);
        Ok(())
    }

    #[test]
    fn env_overrides_file_values() -> Result<()> {
        let mut cfg = parse("[server]\nport = 4000\n")?;
        cfg.apply_env_with(|key| match key {
            "SERVER_PORT" => Some("5000".into()),
            "ROSTER_DATA_FILE" => Some("elsewhere.json".into()),
            "TOKIO_WORKER_THREADS" => Some("not-a-number".into()),
            _ => None,
        });
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.storage.data_file, "elsewhere.json");
        assert_eq!(cfg.server.worker_threads, None);
        Ok(())
    }

    #[test]
    fn api_prefix_is_normalized_and_checked() -> Result<()> {
        let mut cfg = parse("[server]\napi_prefix = \"/v1/\"\n")?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.api_prefix, "/v1");

        let mut bad = parse("[server]\napi_prefix = \"api\"\n")?;
        assert!(bad.normalize_and_validate().is_err());
        Ok(())
    }

    #[test]
    fn rejects_zero_port_and_unknown_write_mode() {
        let mut cfg = parse("[server]\nport = 0\n").expect("parse");
        assert!(cfg.normalize_and_validate().is_err());
        assert!(parse("[storage]\nwrite_mode = \"sideways\"\n").is_err());
    }
}
