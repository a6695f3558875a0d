// tests/cash_handshake.rs
//
// Exercises the file-mediated request/result handshake with the external
// cash-price checker through the scheduler entry points.

use std::collections::HashMap;

use chrono::Utc;
use tempfile::TempDir;

use fare_monitor::cash::{self, CashRequest, CashResult};
use fare_monitor::scheduler::{poll_cash_results, refresh_monitor};
use fare_monitor::state::{DocumentPaths, EngineState};
use fare_monitor::types::{AvailabilityMode, CashRecord, Channel, Leg, Monitor};

fn leg(origin: &str, destination: &str, start: &str, end: &str) -> Leg {
    Leg {
        origin: origin.to_string(),
        destination: destination.to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

fn cash_monitor() -> Monitor {
    Monitor::new(
        "SYD-LHR cash".to_string(),
        vec!["business".to_string()],
        Channel::Cash,
        AvailabilityMode::Rewards,
        leg("SYD", "LHR", "2026-09-01", "2026-09-04"),
        leg("LHR", "SYD", "2026-09-20", "2026-09-24"),
    )
}

async fn engine_with_monitor(dir: &TempDir, monitor: Monitor) -> (EngineState, String) {
    let paths = DocumentPaths::in_dir(dir.path().to_path_buf());
    let state = EngineState::initialize(paths).expect("engine state");
    let id = monitor.id.clone();
    {
        let mut store = state.store.write().await;
        store.insert(monitor);
        store.save_to_file(&state.paths.monitors).unwrap();
    }
    (state, id)
}

fn result_doc(id: &str, aud: f64, request_id: Option<u64>) -> CashResult {
    let mut prices = HashMap::new();
    prices.insert(
        "business".to_string(),
        CashRecord {
            aud,
            outbound_date: "2026-09-02".to_string(),
            return_date: "2026-09-21".to_string(),
            is_direct: true,
            seen_at: Utc::now(),
        },
    );
    CashResult {
        monitor_id: id.to_string(),
        checked_at: Some(Utc::now()),
        request_id,
        prices,
    }
}

#[tokio::test]
async fn refresh_queues_one_request_and_stays_pending() {
    let dir = TempDir::new().unwrap();
    let (state, id) = engine_with_monitor(&dir, cash_monitor()).await;

    refresh_monitor(&state, &id).await.unwrap();
    let requests: Vec<CashRequest> = cash::load_document(&state.paths.cash_requests);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].monitor_id, id);
    assert_eq!(requests[0].request_id, 0);
    assert_eq!(requests[0].cabins, vec!["business".to_string()]);

    // A monitor that never resolves stays pending across later cycles
    // without queueing a duplicate request.
    refresh_monitor(&state, &id).await.unwrap();
    refresh_monitor(&state, &id).await.unwrap();
    let requests: Vec<CashRequest> = cash::load_document(&state.paths.cash_requests);
    assert_eq!(requests.len(), 1);

    let store = state.store.read().await;
    assert!(store.get(&id).unwrap().cash_pending);
}

#[tokio::test]
async fn matching_result_is_consumed_exactly_once() {
    let dir = TempDir::new().unwrap();
    let (state, id) = engine_with_monitor(&dir, cash_monitor()).await;
    refresh_monitor(&state, &id).await.unwrap();

    cash::save_document(
        &state.paths.cash_results,
        &[result_doc(&id, 4320.0, Some(0))],
    )
    .unwrap();

    let applied = poll_cash_results(&state).await.unwrap();
    assert_eq!(applied, 1);

    {
        let store = state.store.read().await;
        let monitor = store.get(&id).unwrap();
        assert!(!monitor.cash_pending);
        assert!(monitor.last_checked_at.is_some());
        assert_eq!(monitor.cash_lowest.get("J").unwrap().aud, 4320.0);
    }

    // Result document was reset to an empty collection.
    let leftover: Vec<CashResult> = cash::load_document(&state.paths.cash_results);
    assert!(leftover.is_empty());

    // One alert batch made it onto the queue.
    let alerts = state.alerts.lock().await.pending();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].messages[0].contains("$4,320.00"));

    // Polling again with nothing queued applies nothing.
    assert_eq!(poll_cash_results(&state).await.unwrap(), 0);
}

#[tokio::test]
async fn stale_result_after_edit_is_discarded() {
    let dir = TempDir::new().unwrap();
    let (state, id) = engine_with_monitor(&dir, cash_monitor()).await;
    refresh_monitor(&state, &id).await.unwrap();

    // A core-field edit invalidates the outstanding request.
    {
        let mut store = state.store.write().await;
        let monitor = store.get_mut(&id).unwrap();
        monitor.reset_tracking();
        store.save_to_file(&state.paths.monitors).unwrap();
    }

    cash::save_document(
        &state.paths.cash_results,
        &[result_doc(&id, 4320.0, Some(0))],
    )
    .unwrap();
    let applied = poll_cash_results(&state).await.unwrap();
    assert_eq!(applied, 0);

    let store = state.store.read().await;
    let monitor = store.get(&id).unwrap();
    assert!(monitor.cash_lowest.is_empty());
    assert_eq!(monitor.cash_request_id, 1);
}

#[tokio::test]
async fn improving_results_alert_and_worse_results_do_not() {
    let dir = TempDir::new().unwrap();
    let (state, id) = engine_with_monitor(&dir, cash_monitor()).await;

    refresh_monitor(&state, &id).await.unwrap();
    cash::save_document(
        &state.paths.cash_results,
        &[result_doc(&id, 5000.0, Some(0))],
    )
    .unwrap();
    poll_cash_results(&state).await.unwrap();

    // Second round trip: dearer fare, no new alert batch.
    refresh_monitor(&state, &id).await.unwrap();
    cash::save_document(
        &state.paths.cash_results,
        &[result_doc(&id, 5400.0, Some(0))],
    )
    .unwrap();
    poll_cash_results(&state).await.unwrap();
    assert_eq!(state.alerts.lock().await.pending().len(), 1);

    // Third: cheaper fare, alert references the previous low.
    refresh_monitor(&state, &id).await.unwrap();
    cash::save_document(
        &state.paths.cash_results,
        &[result_doc(&id, 4100.0, Some(0))],
    )
    .unwrap();
    poll_cash_results(&state).await.unwrap();

    let alerts = state.alerts.lock().await.pending();
    assert_eq!(alerts.len(), 2);
    let last = &alerts[1].messages[0];
    assert!(last.contains("$4,100.00"));
    assert!(last.contains("(was $5,000.00)"));

    let store = state.store.read().await;
    assert_eq!(store.get(&id).unwrap().cash_lowest.get("J").unwrap().aud, 4100.0);
}

#[tokio::test]
async fn corrupt_documents_read_as_empty() {
    let dir = TempDir::new().unwrap();
    let (state, id) = engine_with_monitor(&dir, cash_monitor()).await;

    std::fs::write(&state.paths.cash_results, "{ not json").unwrap();
    assert_eq!(poll_cash_results(&state).await.unwrap(), 0);

    std::fs::write(&state.paths.cash_requests, "[[[[").unwrap();
    refresh_monitor(&state, &id).await.unwrap();
    let requests: Vec<CashRequest> = cash::load_document(&state.paths.cash_requests);
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn request_is_replaced_not_duplicated_after_reset() {
    let dir = TempDir::new().unwrap();
    let (state, id) = engine_with_monitor(&dir, cash_monitor()).await;
    refresh_monitor(&state, &id).await.unwrap();

    {
        let mut store = state.store.write().await;
        store.get_mut(&id).unwrap().reset_tracking();
        store.save_to_file(&state.paths.monitors).unwrap();
    }

    // No longer pending, so a new request replaces the old entry and
    // carries the bumped id.
    refresh_monitor(&state, &id).await.unwrap();
    let requests: Vec<CashRequest> = cash::load_document(&state.paths.cash_requests);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request_id, 1);
}
