// src/scheduler.rs
// Drives periodic and on-demand monitor refreshes plus the cash-result poll.

use std::env;

use chrono::Utc;
use tokio::time::{interval, sleep, Duration};
use tracing::{error, info, warn};

use crate::cash::{self, CashResult};
use crate::errors::EngineError;
use crate::state::EngineState;
use crate::tracker;
use crate::types::Channel;

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;
const DEFAULT_CASH_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_STARTUP_REFRESH_DELAY_SECS: u64 = 15;

fn env_secs(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Hourly full refresh cycle.
pub async fn run_refresh_service(state: EngineState) {
    let interval_secs = env_secs("REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL_SECS);
    info!(
        "⏱️ [SCHEDULER] Refresh service started, interval {}s",
        interval_secs
    );
    let mut ticker = interval(Duration::from_secs(interval_secs));
    // The startup task owns the first run; skip the immediate tick.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        run_full_cycle(&state).await;
    }
}

/// One delayed refresh shortly after process start.
pub async fn run_startup_refresh(state: EngineState) {
    let delay = env_secs(
        "STARTUP_REFRESH_DELAY_SECS",
        DEFAULT_STARTUP_REFRESH_DELAY_SECS,
    );
    sleep(Duration::from_secs(delay)).await;
    info!("⏱️ [SCHEDULER] Running startup refresh cycle");
    run_full_cycle(&state).await;
}

/// 30-second cash-result poll, independent of the refresh cycle.
pub async fn run_cash_poll_service(state: EngineState) {
    let interval_secs = env_secs("CASH_POLL_INTERVAL_SECS", DEFAULT_CASH_POLL_INTERVAL_SECS);
    let mut ticker = interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        if let Err(e) = poll_cash_results(&state).await {
            error!("💸 [SCHEDULER] Cash result poll failed: {}", e);
        }
    }
}

/// Refresh every monitor in turn, sequentially. A failure on one monitor
/// is logged and the cycle moves on.
pub async fn run_full_cycle(state: &EngineState) {
    let ids: Vec<(String, String)> = {
        let store = state.store.read().await;
        store
            .monitors
            .iter()
            .map(|m| (m.id.clone(), m.label.clone()))
            .collect()
    };
    info!(
        "🔄 [SCHEDULER] Refresh cycle started for {} monitor(s)",
        ids.len()
    );
    for (id, label) in ids {
        if let Err(e) = refresh_monitor(state, &id).await {
            error!("🔄 [SCHEDULER] Refresh failed for {}: {}", label, e);
        }
    }
    info!("🔄 [SCHEDULER] Refresh cycle complete");
}

/// Refresh one monitor: award monitors fetch both legs in parallel and run
/// the tracker; cash monitors only (re-)queue a handshake request.
pub async fn refresh_monitor(
    state: &EngineState,
    id: &str,
) -> Result<Vec<String>, EngineError> {
    let (channel, label, outbound, return_leg, cabins, mode) = {
        let store = state.store.read().await;
        let monitor = store
            .get(id)
            .ok_or_else(|| EngineError::MonitorNotFound(id.to_string()))?;
        (
            monitor.channel,
            monitor.label.clone(),
            monitor.outbound.clone(),
            monitor.return_leg.clone(),
            monitor.cabins.clone(),
            monitor.mode,
        )
    };

    match channel {
        Channel::Cash => {
            let mut store = state.store.write().await;
            let monitor = store
                .get_mut(id)
                .ok_or_else(|| EngineError::MonitorNotFound(id.to_string()))?;
            let queued = cash::queue_request(&state.paths.cash_requests, monitor, Utc::now())?;
            if queued {
                store.save_to_file(&state.paths.monitors)?;
            }
            Ok(Vec::new())
        }
        Channel::Awards => {
            // Both legs in parallel; either failure abandons the refresh
            // with no partial update.
            let (out_flights, ret_flights) = tokio::try_join!(
                state.fetcher.fetch_leg(&outbound, &cabins, mode),
                state.fetcher.fetch_leg(&return_leg, &cabins, mode),
            )?;

            let now = Utc::now();
            let messages = {
                let mut store = state.store.write().await;
                let monitor = store
                    .get_mut(id)
                    .ok_or_else(|| EngineError::MonitorNotFound(id.to_string()))?;
                // An edit landed while the fetch was in flight; these
                // results belong to the old epoch.
                if monitor.outbound != outbound
                    || monitor.return_leg != return_leg
                    || monitor.mode != mode
                {
                    warn!(
                        "🔄 [SCHEDULER] {} was edited mid-refresh, discarding results",
                        monitor.label
                    );
                    return Ok(Vec::new());
                }
                let messages = tracker::track_refresh(monitor, out_flights, ret_flights, now);
                store.save_to_file(&state.paths.monitors)?;
                messages
            };

            state.push_alerts(id, &label, messages.clone()).await;
            Ok(messages)
        }
    }
}

/// Consume the cash-result document: apply each entry to its monitor and
/// reset the document to empty. Results are consumed at most once; a crash
/// between read and clear re-applies on the next poll, which is accepted.
pub async fn poll_cash_results(state: &EngineState) -> Result<usize, EngineError> {
    let results: Vec<CashResult> = cash::load_document(&state.paths.cash_results);
    if results.is_empty() {
        return Ok(0);
    }
    info!("💸 [SCHEDULER] Consuming {} cash result(s)", results.len());

    let now = Utc::now();
    let mut batches: Vec<(String, String, Vec<String>)> = Vec::new();
    let mut applied = 0;
    {
        let mut store = state.store.write().await;
        for result in &results {
            let Some(monitor) = store.get_mut(&result.monitor_id) else {
                warn!(
                    "💸 [SCHEDULER] Result for unknown monitor {}, dropping",
                    result.monitor_id
                );
                continue;
            };
            if monitor.channel != Channel::Cash {
                warn!(
                    "💸 [SCHEDULER] Result for non-cash monitor {}, dropping",
                    monitor.label
                );
                continue;
            }
            if let Some(messages) = cash::apply_result(monitor, result, now) {
                applied += 1;
                if !messages.is_empty() {
                    batches.push((monitor.id.clone(), monitor.label.clone(), messages));
                }
            }
        }
        if applied > 0 {
            store.save_to_file(&state.paths.monitors)?;
        }
    }

    for (id, label, messages) in batches {
        state.push_alerts(&id, &label, messages).await;
    }

    cash::save_document::<CashResult>(&state.paths.cash_results, &[])?;
    Ok(applied)
}
