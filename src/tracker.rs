// src/tracker.rs
// Lowest-price and slot tracking for one monitor refresh.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{
    cabin_code, cabin_label, format_points, LowestRecord, Monitor, NormalizedFlight,
    REFERENCE_CURRENCY,
};

/// Composite key recording one observed (date, cabin, direction) slot.
pub fn slot_key(date: &str, cabin: &str, direction: &str) -> String {
    format!("{}|{}|{}", date, cabin, direction)
}

/// First entry with the strictly lowest cost for a cabin. Inputs are
/// date-sorted, so ties resolve to the earliest date seen.
fn cheapest<'a>(flights: &'a [NormalizedFlight], code: &str) -> Option<&'a NormalizedFlight> {
    let mut best: Option<&NormalizedFlight> = None;
    for flight in flights.iter().filter(|f| f.cabin == code) {
        match best {
            Some(b) if flight.mileage_cost >= b.mileage_cost => {}
            _ => best = Some(flight),
        }
    }
    best
}

/// Apply one refresh's normalized legs to the monitor: detect new slots,
/// rebuild current records, update historical lows, and persist the new
/// state onto the monitor. Returns the alert lines this refresh produced.
pub fn track_refresh(
    monitor: &mut Monitor,
    outbound: Vec<NormalizedFlight>,
    return_leg: Vec<NormalizedFlight>,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut messages = Vec::new();

    // New-slot detection across both directions.
    for (flights, direction) in [(&outbound, "outbound"), (&return_leg, "return")] {
        for flight in flights.iter() {
            let key = slot_key(&flight.date, &flight.cabin, direction);
            if monitor.known_slots.insert(key) {
                messages.push(format!(
                    "New {} {} available: {} for {} pts",
                    direction,
                    cabin_label(&flight.cabin),
                    flight.date,
                    format_points(flight.mileage_cost)
                ));
            }
        }
    }

    // Cheapest combined round trip per tracked cabin.
    let mut current: HashMap<String, LowestRecord> = HashMap::new();
    for cabin in &monitor.cabins {
        let code = cabin_code(cabin);
        let (best_out, best_ret) = match (cheapest(&outbound, &code), cheapest(&return_leg, &code))
        {
            (Some(o), Some(r)) => (o, r),
            // One-sided availability: no current record, lowest untouched.
            _ => continue,
        };

        let record = LowestRecord {
            points: best_out.mileage_cost + best_ret.mileage_cost,
            outbound_date: best_out.date.clone(),
            return_date: best_ret.date.clone(),
            seen_at: now,
            total_taxes: best_out.tax_amount + best_ret.tax_amount,
            tax_currency: best_out
                .tax_currency
                .clone()
                .or_else(|| best_ret.tax_currency.clone())
                .unwrap_or_else(|| REFERENCE_CURRENCY.to_string()),
            is_direct: best_out.is_direct && best_ret.is_direct,
        };

        let previous_points = monitor.lowest.get(&code).map(|r| r.points);
        match previous_points {
            Some(previous) if record.points < previous => {
                messages.push(format!(
                    "New lowest {} price: {} pts ({} out, {} back) (was {})",
                    cabin_label(&code),
                    format_points(record.points),
                    record.outbound_date,
                    record.return_date,
                    format_points(previous)
                ));
                monitor.lowest.insert(code.clone(), record.clone());
            }
            None => {
                messages.push(format!(
                    "New lowest {} price: {} pts ({} out, {} back)",
                    cabin_label(&code),
                    format_points(record.points),
                    record.outbound_date,
                    record.return_date
                ));
                monitor.lowest.insert(code.clone(), record.clone());
            }
            _ => {
                debug!(
                    "[TRACKER] {} {}: {} pts is not below stored low",
                    monitor.label,
                    code,
                    format_points(record.points)
                );
            }
        }

        current.insert(code, record);
    }

    monitor.last_checked_at = Some(now);
    monitor.current_outbound = outbound;
    monitor.current_return = return_leg;
    monitor.current = current;

    messages
}
