// src/store.rs
// Monitor Store: the persisted collection of monitors, one whole JSON
// document. All mutations run behind the engine's write lock.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::EngineError;
use crate::types::{AvailabilityMode, Leg, Monitor};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStore {
    pub last_updated: DateTime<Utc>,
    pub monitors: Vec<Monitor>,
}

impl MonitorStore {
    pub fn new() -> Self {
        Self {
            last_updated: Utc::now(),
            monitors: Vec::new(),
        }
    }

    /// Load the store. A missing file starts empty; a corrupt file is a
    /// startup error rather than silently dropped monitors.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("📁 [STORE] Creating new monitor store at {:?}", path);
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let store: MonitorStore = serde_json::from_str(&content)?;
        info!(
            "📁 [STORE] Loaded {} monitor(s) from {:?}",
            store.monitors.len(),
            path
        );
        Ok(store)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        debug!(
            "📁 [STORE] Saved {} monitor(s) to {:?}",
            self.monitors.len(),
            path.as_ref()
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Monitor> {
        self.last_updated = Utc::now();
        self.monitors.iter_mut().find(|m| m.id == id)
    }

    pub fn insert(&mut self, monitor: Monitor) {
        self.last_updated = Utc::now();
        self.monitors.push(monitor);
    }

    pub fn remove(&mut self, id: &str) -> Option<Monitor> {
        self.last_updated = Utc::now();
        let index = self.monitors.iter().position(|m| m.id == id)?;
        Some(self.monitors.remove(index))
    }
}

impl Default for MonitorStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Does an edit to these fields force a fresh tracking epoch?
/// Route, either date bound, the cabin set, or the availability mode.
pub fn requires_reset(
    monitor: &Monitor,
    outbound: &Leg,
    return_leg: &Leg,
    cabins: &[String],
    mode: AvailabilityMode,
) -> bool {
    let old_cabins: BTreeSet<&str> = monitor.cabins.iter().map(|c| c.as_str()).collect();
    let new_cabins: BTreeSet<&str> = cabins.iter().map(|c| c.as_str()).collect();
    monitor.outbound != *outbound
        || monitor.return_leg != *return_leg
        || old_cabins != new_cabins
        || monitor.mode != mode
}

/// Apply an edit to a monitor, resetting tracking state when a core field
/// changed. Returns true when a reset happened.
pub fn apply_edit(
    monitor: &mut Monitor,
    label: String,
    cabins: Vec<String>,
    mode: AvailabilityMode,
    outbound: Leg,
    return_leg: Leg,
) -> bool {
    let reset = requires_reset(monitor, &outbound, &return_leg, &cabins, mode);

    monitor.label = label;
    monitor.cabins = cabins;
    monitor.mode = mode;
    monitor.outbound = outbound;
    monitor.return_leg = return_leg;

    if reset {
        info!(
            "📁 [STORE] Core fields changed for {}, resetting tracking state",
            monitor.label
        );
        monitor.reset_tracking();
    }
    reset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Channel;

    fn leg(origin: &str, destination: &str, start: &str, end: &str) -> Leg {
        Leg {
            origin: origin.to_string(),
            destination: destination.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
        }
    }

    fn monitor() -> Monitor {
        Monitor::new(
            "SYD-BOS".to_string(),
            vec!["business".to_string(), "premium".to_string()],
            Channel::Awards,
            AvailabilityMode::Rewards,
            leg("SYD", "BOS", "2026-06-01", "2026-06-05"),
            leg("BOS", "SYD", "2026-06-18", "2026-06-22"),
        )
    }

    #[test]
    fn test_label_edit_does_not_reset() {
        let mut m = monitor();
        m.known_slots.insert("2026-06-02|J|outbound".to_string());

        let cabins = m.cabins.clone();
        let mode = m.mode;
        let outbound = m.outbound.clone();
        let return_leg = m.return_leg.clone();
        let reset = apply_edit(
            &mut m,
            "renamed".to_string(),
            cabins,
            mode,
            outbound,
            return_leg,
        );
        assert!(!reset);
        assert_eq!(m.label, "renamed");
        assert_eq!(m.known_slots.len(), 1);
    }

    #[test]
    fn test_cabin_order_is_not_a_core_change() {
        let m = monitor();
        let reordered = vec!["premium".to_string(), "business".to_string()];
        assert!(!requires_reset(
            &m,
            &m.outbound,
            &m.return_leg,
            &reordered,
            m.mode
        ));
    }

    #[test]
    fn test_date_bound_edit_resets() {
        let mut m = monitor();
        m.known_slots.insert("2026-06-02|J|outbound".to_string());
        m.cash_request_id = 4;

        let label = m.label.clone();
        let cabins = m.cabins.clone();
        let mode = m.mode;
        let return_leg = m.return_leg.clone();
        let reset = apply_edit(
            &mut m,
            label,
            cabins,
            mode,
            leg("SYD", "BOS", "2026-06-02", "2026-06-06"),
            return_leg,
        );
        assert!(reset);
        assert!(m.known_slots.is_empty());
        assert!(m.lowest.is_empty());
        assert_eq!(m.cash_request_id, 5);
    }

    #[test]
    fn test_mode_edit_resets() {
        let mut m = monitor();
        assert!(requires_reset(
            &m,
            &m.outbound,
            &m.return_leg,
            &m.cabins,
            AvailabilityMode::Any
        ));
    }
}
