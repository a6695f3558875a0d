// src/alerts.rs
// Append-only alert document. The engine only ever appends whole batches;
// the external notifier reads the collection and resets it to empty.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::cash::{load_document, save_document};
use crate::errors::EngineError;
use crate::types::PendingAlert;

pub struct AlertQueue {
    path: PathBuf,
}

impl AlertQueue {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one batch. The file is re-read on every append so a clear
    /// by the external notifier between batches is never undone.
    pub fn append(
        &self,
        monitor_id: &str,
        monitor_label: &str,
        messages: Vec<String>,
    ) -> Result<(), EngineError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut pending: Vec<PendingAlert> = load_document(&self.path);
        info!(
            "📨 [ALERTS] Queueing {} alert line(s) for {}",
            messages.len(),
            monitor_label
        );
        pending.push(PendingAlert {
            monitor_id: monitor_id.to_string(),
            monitor_label: monitor_label.to_string(),
            messages,
            created_at: Utc::now(),
        });
        save_document(&self.path, &pending)
    }

    pub fn pending(&self) -> Vec<PendingAlert> {
        load_document(&self.path)
    }
}
