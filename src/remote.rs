use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::models::Application;

pub const APPLICATIONS_TABLE: &str = "applications";
pub const PRIMARY_KEY: &str = "app_id";

/// Endpoint and anonymous key of the remote database.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
}

impl RemoteConfig {
    /// Both secrets or nothing; blank values count as missing.
    pub fn from_values(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let url = url.filter(|v| !v.trim().is_empty())?;
        let anon_key = anon_key.filter(|v| !v.trim().is_empty())?;
        Some(Self {
            url: url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
        })
    }
}

/// Something that can insert-or-replace a batch of rows in a named table.
pub trait RemoteClient: Send + Sync {
    fn upsert(&self, table: &str, rows: &[Value], on_conflict: &str) -> Result<Value>;
}

// --- Supabase (PostgREST) client ---

#[derive(Debug)]
pub struct SupabaseClient {
    config: RemoteConfig,
    client: reqwest::blocking::Client,
}

impl SupabaseClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Self::with_http_client(config, client)
    }

    pub fn with_http_client(config: RemoteConfig, client: reqwest::blocking::Client) -> Result<Self> {
        if !(config.url.starts_with("https://") || config.url.starts_with("http://")) {
            return Err(anyhow!("Remote URL must be http(s): {}", config.url));
        }
        Ok(Self { config, client })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }
}

impl RemoteClient for SupabaseClient {
    fn upsert(&self, table: &str, rows: &[Value], on_conflict: &str) -> Result<Value> {
        let response = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.config.anon_key))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(rows)
            .send()
            .with_context(|| format!("Failed to send upsert to '{}'", table))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Upsert into '{}' failed with status {}: {}",
                table,
                status,
                error_text
            ));
        }

        let body = response.text().context("Failed to read upsert response")?;
        if body.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        serde_json::from_str(&body).context("Failed to parse upsert response")
    }
}

// --- Sync handle held by the tracker ---

/// Optional remote mirror. Decided once at startup and never re-initialized;
/// a disabled handle makes every sync a no-op.
#[derive(Clone, Default)]
pub struct RemoteSync {
    client: Option<Arc<dyn RemoteClient>>,
}

impl RemoteSync {
    pub fn disabled() -> Self {
        Self { client: None }
    }

    /// Builds a Supabase-backed handle when both secrets are present. Any
    /// construction failure leaves sync disabled for the session.
    pub fn initialize(config: Option<RemoteConfig>) -> Self {
        let Some(config) = config else {
            return Self::disabled();
        };
        match SupabaseClient::new(config) {
            Ok(client) => {
                log::info!("Remote sync enabled");
                Self::with_client(client)
            }
            Err(e) => {
                log::warn!("Remote sync init failed: {:#}", e);
                Self::disabled()
            }
        }
    }

    pub fn with_client(client: impl RemoteClient + 'static) -> Self {
        Self {
            client: Some(Arc::new(client)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Upserts every application keyed by `app_id`, blocking until the remote
    /// answers. Errors are logged and come back as `None`.
    pub fn sync_collection(&self, table: &str, apps: &[Application]) -> Option<Value> {
        let client = self.client.as_ref()?;
        push(client.as_ref(), table, apps)
    }

    /// Same as [`sync_collection`](Self::sync_collection) but on a background
    /// thread. Returns `None` without spawning anything when sync is disabled.
    pub fn spawn_sync(&self, table: &str, apps: Vec<Application>) -> Option<PendingSync> {
        let client = Arc::clone(self.client.as_ref()?);
        let table = table.to_string();
        let spawned = thread::Builder::new()
            .name("apex-sync".to_string())
            .spawn(move || push(client.as_ref(), &table, &apps));
        match spawned {
            Ok(handle) => Some(PendingSync { handle }),
            Err(e) => {
                log::warn!("Failed to start remote sync: {}", e);
                None
            }
        }
    }
}

fn push(client: &dyn RemoteClient, table: &str, apps: &[Application]) -> Option<Value> {
    let rows = match apps.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>() {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("Failed to serialize rows for remote sync: {}", e);
            return None;
        }
    };
    match client.upsert(table, &rows, PRIMARY_KEY) {
        Ok(data) => {
            log::debug!("Synced {} row(s) to '{}'", rows.len(), table);
            Some(data)
        }
        Err(e) => {
            log::warn!("Remote sync failed: {:#}", e);
            None
        }
    }
}

/// An in-flight background sync. Dropping it abandons the result; the
/// thread still runs to completion.
#[derive(Debug)]
pub struct PendingSync {
    handle: JoinHandle<Option<Value>>,
}

impl PendingSync {
    pub fn wait(self) -> Option<Value> {
        self.handle.join().unwrap_or_else(|_| {
            log::warn!("Remote sync thread panicked");
            None
        })
    }
}
