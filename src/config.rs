use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants;
use crate::error::{BenchError, Result};

const ENDPOINT_REQUIRED: &str =
    "BENCH_DATA_ENDPOINT must be set to a signing proxy or DynamoDB-compatible endpoint";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub object_store: ObjectStoreConfig,
    pub http_timeout_secs: u64,
    /// Prometheus exporter listen address; no exporter when unset
    pub metrics_addr: Option<String>,
}

/// Key-value store holding the benchmark records
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of a DynamoDB-protocol endpoint that accepts unsigned
    /// requests (a SigV4 signing proxy or a local emulator). Required.
    pub endpoint: Option<String>,
    pub table: String,
    pub index: String,
    /// Sent as a bearer token when present (signing proxies, local emulators)
    pub auth_token: Option<String>,
}

/// Supabase Storage settings for the object helpers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            object_store: ObjectStoreConfig::default(),
            http_timeout_secs: constants::DEFAULT_HTTP_TIMEOUT_SECS,
            metrics_addr: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            table: constants::DEFAULT_TABLE.to_string(),
            index: constants::DEFAULT_INDEX.to_string(),
            auth_token: None,
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            page_size: constants::DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    pub fn endpoint_url(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .ok_or_else(|| BenchError::Config(ENDPOINT_REQUIRED.into()))
    }
}

impl ObjectStoreConfig {
    pub fn require_url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .ok_or_else(|| {
                BenchError::Config("SUPABASE_URL or SUPABASE_PROJECT_REF must be set".into())
            })
    }

    pub fn require_key(&self) -> Result<&str> {
        self.service_key
            .as_deref()
            .ok_or_else(|| BenchError::Config("SUPABASE_SERVICE_ROLE_KEY must be set".into()))
    }
}

impl Config {
    /// Load `.env`, the TOML file (if it exists) and then environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let path = std::env::var("BENCH_DATA_CONFIG")
            .unwrap_or_else(|_| constants::DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BENCH_DATA_ENDPOINT") {
            self.store.endpoint = Some(v);
        }
        if let Some(v) = get("BENCH_DATA_TABLE") {
            self.store.table = v;
        }
        if let Some(v) = get("BENCH_DATA_INDEX") {
            self.store.index = v;
        }
        if let Some(v) = get("BENCH_DATA_AUTH_TOKEN") {
            self.store.auth_token = Some(v);
        }

        // Either a full URL or a project ref
        if let Some(v) = get("SUPABASE_URL") {
            self.object_store.url = Some(v);
        } else if let Some(project_ref) = get("SUPABASE_PROJECT_REF") {
            self.object_store.url = Some(format!("https://{}.supabase.co", project_ref));
        }
        if let Some(v) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.object_store.service_key = Some(v);
        }

        if let Some(v) = get("BENCH_DATA_METRICS_ADDR") {
            self.metrics_addr = Some(v);
        }
        if let Some(v) = get("BENCH_DATA_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v.parse().map_err(|_| {
                BenchError::Config(format!(
                    "BENCH_DATA_HTTP_TIMEOUT_SECS is not a number: {}",
                    v
                ))
            })?;
        }
        if let Some(v) = get("BENCH_DATA_PAGE_SIZE") {
            let size: u32 = v.parse().map_err(|_| {
                BenchError::Config(format!("BENCH_DATA_PAGE_SIZE is not a number: {}", v))
            })?;
            if size == 0 {
                return Err(BenchError::Config(
                    "BENCH_DATA_PAGE_SIZE must be positive".into(),
                ));
            }
            self.object_store.page_size = size;
        }
        Ok(())
    }
}
