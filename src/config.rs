use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Where table snapshots are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotBackend {
    File(PathBuf),
    Redis(String),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Snapshot store
    pub snapshot_backend: SnapshotBackend,

    // Remote price catalog
    pub remote_catalog_url: Option<String>,
    pub remote_catalog_token: String,
    pub remote_catalog_timeout_seconds: u64,

    // Estimator
    pub estimate_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            server_addr: "0.0.0.0:8080".to_string(),
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            snapshot_backend: SnapshotBackend::Memory,
            remote_catalog_url: None,
            remote_catalog_token: String::new(),
            remote_catalog_timeout_seconds: 30,
            estimate_seed: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Snapshot store
        let backend = env::var("SNAPSHOT_BACKEND").unwrap_or_else(|_| "file".to_string());
        let snapshot_backend = match backend.to_lowercase().as_str() {
            "file" => SnapshotBackend::File(PathBuf::from(
                env::var("SNAPSHOT_DIR").unwrap_or_else(|_| "./data".to_string()),
            )),
            "redis" => SnapshotBackend::Redis(
                env::var("REDIS_URL").unwrap_or_else(|_| "redis://redis:6379/0".to_string()),
            ),
            "memory" => SnapshotBackend::Memory,
            other => bail!("Unknown SNAPSHOT_BACKEND '{}' (expected file, redis or memory)", other),
        };

        // Remote price catalog
        let remote_catalog_url = env::var("REMOTE_CATALOG_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(raw) = &remote_catalog_url {
            url::Url::parse(raw).context("REMOTE_CATALOG_URL must be a valid URL")?;
        }
        let remote_catalog_token = env::var("REMOTE_CATALOG_TOKEN").unwrap_or_default();
        let remote_catalog_timeout_seconds = env::var("REMOTE_CATALOG_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        // Estimator
        let estimate_seed = match env::var("ESTIMATE_SEED") {
            Ok(raw) => Some(
                raw.trim()
                    .parse()
                    .context("ESTIMATE_SEED must be an unsigned integer")?,
            ),
            Err(_) => None,
        };

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            snapshot_backend,
            remote_catalog_url,
            remote_catalog_token,
            remote_catalog_timeout_seconds,
            estimate_seed,
        })
    }
}
