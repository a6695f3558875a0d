// src/state.rs
// Shared engine state handed to the scheduler tasks and the HTTP surface.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::error;

use crate::alerts::AlertQueue;
use crate::errors::EngineError;
use crate::fetcher::LegFetcher;
use crate::store::MonitorStore;

#[derive(Debug, Clone)]
pub struct DocumentPaths {
    pub monitors: PathBuf,
    pub cash_requests: PathBuf,
    pub cash_results: PathBuf,
    pub alerts: PathBuf,
}

impl DocumentPaths {
    pub fn from_env() -> Self {
        let dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        Self::in_dir(PathBuf::from(dir))
    }

    pub fn in_dir(dir: PathBuf) -> Self {
        Self {
            monitors: dir.join("monitors.json"),
            cash_requests: dir.join("cash_requests.json"),
            cash_results: dir.join("cash_results.json"),
            alerts: dir.join("alerts.json"),
        }
    }
}

#[derive(Clone)]
pub struct EngineState {
    /// Every mutation runs inside the write guard, save included;
    /// overlapping refreshes serialize on it.
    pub store: Arc<RwLock<MonitorStore>>,
    pub alerts: Arc<Mutex<AlertQueue>>,
    pub fetcher: Arc<LegFetcher>,
    pub paths: DocumentPaths,
}

impl EngineState {
    pub fn initialize(paths: DocumentPaths) -> Result<Self, EngineError> {
        if let Some(dir) = paths.monitors.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let store = MonitorStore::load_from_file(&paths.monitors)?;
        Ok(Self {
            store: Arc::new(RwLock::new(store)),
            alerts: Arc::new(Mutex::new(AlertQueue::new(&paths.alerts))),
            fetcher: Arc::new(LegFetcher::from_env()),
            paths,
        })
    }

    /// Queue one batch of alert lines; failures are logged, not fatal.
    pub async fn push_alerts(&self, monitor_id: &str, label: &str, messages: Vec<String>) {
        if messages.is_empty() {
            return;
        }
        let queue = self.alerts.lock().await;
        if let Err(e) = queue.append(monitor_id, label, messages) {
            error!("📨 [ALERTS] Failed to queue alerts for {}: {}", label, e);
        }
    }
}
