// src/api.rs
// Monitor management surface consumed by the external control layer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::cash;
use crate::scheduler;
use crate::state::EngineState;
use crate::store;
use crate::types::{AvailabilityMode, Channel, Leg, Monitor, TRACKED_CABINS};

/// Create/edit payload: the full monitor definition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDraft {
    pub label: String,
    pub cabins: Vec<String>,
    pub channel: Channel,
    #[serde(default)]
    pub mode: AvailabilityMode,
    pub outbound: Leg,
    #[serde(rename = "return")]
    pub return_leg: Leg,
}

fn validate_draft(draft: &MonitorDraft) -> Result<(), String> {
    if draft.label.trim().is_empty() {
        return Err("label must not be empty".to_string());
    }
    if draft.cabins.is_empty() {
        return Err("at least one cabin must be tracked".to_string());
    }
    for cabin in &draft.cabins {
        if !TRACKED_CABINS.contains(&cabin.as_str()) {
            return Err(format!(
                "unknown cabin '{}' (expected one of {:?})",
                cabin, TRACKED_CABINS
            ));
        }
    }
    draft.outbound.validate().map_err(|e| format!("outbound leg: {}", e))?;
    draft.return_leg.validate().map_err(|e| format!("return leg: {}", e))?;
    Ok(())
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": message})),
    )
}

fn not_found(id: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": format!("monitor {} not found", id)})),
    )
}

async fn health_check(State(state): State<EngineState>) -> Json<Value> {
    let store = state.store.read().await;
    let pending_alerts = state.alerts.lock().await.pending();
    Json(json!({
        "status": "healthy",
        "monitors": store.monitors.len(),
        "pending_alert_batches": pending_alerts.len(),
        "timestamp": Utc::now()
    }))
}

async fn list_monitors_api(State(state): State<EngineState>) -> Json<Value> {
    let store = state.store.read().await;
    Json(json!({
        "monitors": store.monitors,
        "lastUpdated": store.last_updated
    }))
}

async fn get_monitor_api(
    State(state): State<EngineState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let store = state.store.read().await;
    match store.get(&id) {
        Some(monitor) => (StatusCode::OK, Json(json!(monitor))),
        None => not_found(&id),
    }
}

async fn create_monitor_api(
    State(state): State<EngineState>,
    Json(draft): Json<MonitorDraft>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = validate_draft(&draft) {
        return bad_request(e);
    }

    let monitor = Monitor::new(
        draft.label,
        draft.cabins,
        draft.channel,
        draft.mode,
        draft.outbound,
        draft.return_leg,
    );
    let id = monitor.id.clone();
    info!("🆕 [API] Creating monitor {} ({})", monitor.label, id);

    let mut store = state.store.write().await;
    store.insert(monitor);
    if let Err(e) = store.save_to_file(&state.paths.monitors) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": format!("failed to persist: {}", e)})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({"success": true, "id": id})),
    )
}

async fn update_monitor_api(
    State(state): State<EngineState>,
    Path(id): Path<String>,
    Json(draft): Json<MonitorDraft>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = validate_draft(&draft) {
        return bad_request(e);
    }

    let mut store = state.store.write().await;
    let Some(monitor) = store.get_mut(&id) else {
        return not_found(&id);
    };
    if monitor.channel != draft.channel {
        return bad_request("channel cannot be changed on an existing monitor".to_string());
    }
    let reset = store::apply_edit(
        monitor,
        draft.label,
        draft.cabins,
        draft.mode,
        draft.outbound,
        draft.return_leg,
    );
    if let Err(e) = store.save_to_file(&state.paths.monitors) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": format!("failed to persist: {}", e)})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "trackingReset": reset})),
    )
}

async fn delete_monitor_api(
    State(state): State<EngineState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let mut store = state.store.write().await;
    let Some(monitor) = store.remove(&id) else {
        return not_found(&id);
    };
    info!("🗑️ [API] Deleted monitor {} ({})", monitor.label, id);
    let _ = cash::drop_request(&state.paths.cash_requests, &id);
    if let Err(e) = store.save_to_file(&state.paths.monitors) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": format!("failed to persist: {}", e)})),
        );
    }
    (StatusCode::OK, Json(json!({"success": true})))
}

async fn refresh_monitor_api(
    State(state): State<EngineState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    info!("🔄 [API] On-demand refresh for monitor {}", id);
    match scheduler::refresh_monitor(&state, &id).await {
        Ok(messages) => (
            StatusCode::OK,
            Json(json!({"success": true, "alerts": messages})),
        ),
        Err(e) => (
            e.status_code(),
            Json(json!({"success": false, "message": e.to_string()})),
        ),
    }
}

async fn refresh_all_api(State(state): State<EngineState>) -> (StatusCode, Json<Value>) {
    info!("🔄 [API] On-demand full refresh cycle requested");
    let cycle_state = state.clone();
    tokio::spawn(async move {
        scheduler::run_full_cycle(&cycle_state).await;
    });
    (
        StatusCode::ACCEPTED,
        Json(json!({"success": true, "message": "refresh cycle started"})),
    )
}

async fn alerts_api(State(state): State<EngineState>) -> Json<Value> {
    let pending = state.alerts.lock().await.pending();
    Json(json!({ "alerts": pending }))
}

pub fn router(state: EngineState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/monitors", get(list_monitors_api).post(create_monitor_api))
        .route(
            "/monitors/:id",
            get(get_monitor_api)
                .put(update_monitor_api)
                .delete(delete_monitor_api),
        )
        .route("/monitors/:id/refresh", post(refresh_monitor_api))
        .route("/refresh", post(refresh_all_api))
        .route("/alerts", get(alerts_api))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MonitorDraft {
        MonitorDraft {
            label: "SYD-BOS".to_string(),
            cabins: vec!["business".to_string(), "premium".to_string()],
            channel: Channel::Awards,
            mode: AvailabilityMode::Rewards,
            outbound: Leg {
                origin: "SYD".to_string(),
                destination: "BOS".to_string(),
                start_date: "2026-06-01".to_string(),
                end_date: "2026-06-05".to_string(),
            },
            return_leg: Leg {
                origin: "BOS".to_string(),
                destination: "SYD".to_string(),
                start_date: "2026-06-18".to_string(),
                end_date: "2026-06-22".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(validate_draft(&draft()).is_ok());
    }

    #[test]
    fn test_unknown_cabin_rejected() {
        let mut d = draft();
        d.cabins.push("suite".to_string());
        assert!(validate_draft(&d).is_err());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let mut d = draft();
        d.outbound.end_date = "2026-06-09".to_string();
        assert!(validate_draft(&d).is_err());
    }

    #[test]
    fn test_empty_cabins_rejected() {
        let mut d = draft();
        d.cabins.clear();
        assert!(validate_draft(&d).is_err());
    }
}
