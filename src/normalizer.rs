// src/normalizer.rs
// Converts raw per-date availability records from the award-search API
// into canonical NormalizedFlight entries.

use serde_json::Value;

use crate::types::{cabin_code, AvailabilityMode, NormalizedFlight};

/// Typed view of one cabin's fields within a raw per-date record.
/// Everything downstream of this struct is field-name free.
#[derive(Debug, Clone, Default)]
pub struct CabinSnapshot {
    pub available: bool,
    pub mileage_cost: f64,
    pub direct_mileage_cost: f64,
    pub remaining_seats: i64,
    pub airlines: String,
    pub total_taxes: f64,
    pub taxes_currency: Option<String>,
}

// Malformed or missing fields read as zero/false/empty, never as a hard
// failure.

fn num(record: &Value, field: &str) -> f64 {
    match record.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn flag(record: &Value, field: &str) -> bool {
    record.get(field).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn text(record: &Value, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

impl AvailabilityMode {
    /// Resolve the mode-dependent field names for one cabin of one raw
    /// record. The `any` view reads the parallel "Raw" variants, which
    /// include points-plus-pay inventory.
    pub fn cabin_snapshot(&self, record: &Value, code: &str) -> CabinSnapshot {
        let suffix = match self {
            AvailabilityMode::Rewards => "",
            AvailabilityMode::Any => "Raw",
        };
        CabinSnapshot {
            available: flag(record, &format!("{code}Available{suffix}")),
            mileage_cost: num(record, &format!("{code}MileageCost{suffix}")),
            direct_mileage_cost: num(record, &format!("{code}DirectMileageCost{suffix}")),
            remaining_seats: num(record, &format!("{code}RemainingSeats{suffix}")) as i64,
            airlines: text(record, &format!("{code}Airlines")).unwrap_or_default(),
            total_taxes: num(record, &format!("{code}TotalTaxes{suffix}")),
            taxes_currency: text(record, "TaxesCurrency"),
        }
    }
}

/// Normalize raw per-date records into one entry per (date, cabin) pair
/// with positive availability and nonzero cost, sorted by date ascending.
pub fn normalize_flights(
    records: &[Value],
    cabins: &[String],
    mode: AvailabilityMode,
) -> Vec<NormalizedFlight> {
    let mut flights = Vec::new();

    for record in records {
        let date = match record.get("Date").and_then(|v| v.as_str()) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => continue,
        };

        for cabin in cabins {
            let code = cabin_code(cabin);
            let snap = mode.cabin_snapshot(record, &code);
            if !snap.available || snap.mileage_cost <= 0.0 {
                continue;
            }

            // Direct only when the cheapest fare found is also the
            // cheapest direct fare.
            let is_direct =
                snap.direct_mileage_cost > 0.0 && snap.direct_mileage_cost == snap.mileage_cost;

            flights.push(NormalizedFlight {
                date: date.clone(),
                cabin: code,
                mileage_cost: snap.mileage_cost as u64,
                remaining_seats: snap.remaining_seats,
                is_direct,
                airlines: snap.airlines,
                tax_currency: snap.taxes_currency,
                // API reports taxes in minor currency units.
                tax_amount: snap.total_taxes / 100.0,
            });
        }
    }

    flights.sort_by(|a, b| a.date.cmp(&b.date));
    flights
}
