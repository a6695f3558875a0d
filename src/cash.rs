// src/cash.rs
// Cash-price handshake: the engine cannot resolve cash fares itself, so it
// queues requests in a shared document and consumes results another process
// (possibly a human-driven checker) writes back.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::types::{cabin_code, cabin_label, format_cash, CashRecord, Leg, Monitor};

/// One queued fare-check request, keyed uniquely by monitor id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRequest {
    pub monitor_id: String,
    pub label: String,
    pub outbound: Leg,
    #[serde(rename = "return")]
    pub return_leg: Leg,
    pub cabins: Vec<String>,
    pub requested_at: DateTime<Utc>,
    /// Echoed back by the checker; a result carrying an older id than the
    /// monitor's current one is discarded.
    pub request_id: u64,
}

/// One checker result. `prices` cabin keys are canonicalized on consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashResult {
    pub monitor_id: String,
    #[serde(default)]
    pub checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub prices: HashMap<String, CashRecord>,
}

/// Load a handshake document. Missing or corrupt reads as empty.
pub fn load_document<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                "💸 [CASH] Unreadable handshake document {:?} ({}), treating as empty",
                path, e
            );
            Vec::new()
        }
    }
}

pub fn save_document<T: Serialize>(path: &Path, entries: &[T]) -> Result<(), EngineError> {
    let content = serde_json::to_string_pretty(entries)?;
    fs::write(path, content)?;
    Ok(())
}

/// Write (or replace, keyed by monitor id) this monitor's entry in the
/// request document and mark it pending. No-op while a request is already
/// outstanding.
pub fn queue_request(
    path: &Path,
    monitor: &mut Monitor,
    now: DateTime<Utc>,
) -> Result<bool, EngineError> {
    if monitor.cash_pending {
        debug!(
            "💸 [CASH] {} already has an outstanding request, skipping",
            monitor.label
        );
        return Ok(false);
    }

    let mut requests: Vec<CashRequest> = load_document(path);
    requests.retain(|r| r.monitor_id != monitor.id);
    requests.push(CashRequest {
        monitor_id: monitor.id.clone(),
        label: monitor.label.clone(),
        outbound: monitor.outbound.clone(),
        return_leg: monitor.return_leg.clone(),
        cabins: monitor.cabins.clone(),
        requested_at: now,
        request_id: monitor.cash_request_id,
    });
    save_document(path, &requests)?;

    monitor.cash_pending = true;
    monitor.cash_requested_at = Some(now);
    info!("💸 [CASH] Queued fare check for {}", monitor.label);
    Ok(true)
}

/// Drop any queued request for a monitor (used when the monitor is deleted).
pub fn drop_request(path: &Path, monitor_id: &str) -> Result<(), EngineError> {
    let mut requests: Vec<CashRequest> = load_document(path);
    let before = requests.len();
    requests.retain(|r| r.monitor_id != monitor_id);
    if requests.len() != before {
        save_document(path, &requests)?;
    }
    Ok(())
}

/// Apply one checker result to its monitor. Returns the alert lines, or
/// None when the result is stale and was discarded.
pub fn apply_result(
    monitor: &mut Monitor,
    result: &CashResult,
    now: DateTime<Utc>,
) -> Option<Vec<String>> {
    match result.request_id {
        Some(id) if id != monitor.cash_request_id => {
            warn!(
                "💸 [CASH] Discarding stale result for {} (request {} superseded by {})",
                monitor.label, id, monitor.cash_request_id
            );
            return None;
        }
        // Hand-written results carry no id; only trust them while a
        // request is actually outstanding.
        None if !monitor.cash_pending => {
            warn!(
                "💸 [CASH] Discarding unsolicited result for {}",
                monitor.label
            );
            return None;
        }
        _ => {}
    }

    monitor.cash_pending = false;
    monitor.last_checked_at = Some(result.checked_at.unwrap_or(now));

    let mut messages = Vec::new();
    let mut current: HashMap<String, CashRecord> = HashMap::new();
    for (cabin, record) in &result.prices {
        let code = cabin_code(cabin);
        let previous_aud = monitor.cash_lowest.get(&code).map(|r| r.aud);
        match previous_aud {
            Some(previous) if record.aud < previous => {
                messages.push(format!(
                    "New lowest {} cash fare: {} AUD ({} out, {} back) (was {})",
                    cabin_label(&code),
                    format_cash(record.aud),
                    record.outbound_date,
                    record.return_date,
                    format_cash(previous)
                ));
                monitor.cash_lowest.insert(code.clone(), record.clone());
            }
            None => {
                messages.push(format!(
                    "New lowest {} cash fare: {} AUD ({} out, {} back)",
                    cabin_label(&code),
                    format_cash(record.aud),
                    record.outbound_date,
                    record.return_date
                ));
                monitor.cash_lowest.insert(code.clone(), record.clone());
            }
            _ => {}
        }
        current.insert(code, record.clone());
    }
    monitor.cash_current = current;

    Some(messages)
}
