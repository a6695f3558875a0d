// src/types.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Cabin names a monitor may track, in display order.
pub const TRACKED_CABINS: [&str; 4] = ["economy", "premium", "business", "first"];

/// Currency used for cash fares and as the taxes fallback.
pub const REFERENCE_CURRENCY: &str = "AUD";

/// Widest date window a single leg may cover.
pub const MAX_LEG_WINDOW_DAYS: i64 = 5;

/// Map a cabin label onto its compact one-letter tracking code.
/// Unknown labels degrade to their uppercased form instead of failing.
pub fn cabin_code(label: &str) -> String {
    match label.to_lowercase().as_str() {
        "economy" | "y" => "Y".to_string(),
        "premium" | "premium_economy" | "w" => "W".to_string(),
        "business" | "j" => "J".to_string(),
        "first" | "f" => "F".to_string(),
        _ => label.to_uppercase(),
    }
}

/// Display name for a cabin code, used in alert text.
pub fn cabin_label(code: &str) -> String {
    match code {
        "Y" => "economy".to_string(),
        "W" => "premium".to_string(),
        "J" => "business".to_string(),
        "F" => "first".to_string(),
        other => other.to_lowercase(),
    }
}

/// Format a points balance with thousands separators ("293,000").
pub fn format_points(points: u64) -> String {
    let digits = points.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a cash amount as "$1,234.56".
pub fn format_cash(amount: f64) -> String {
    let total_cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        format_points(total_cents / 100),
        total_cents % 100
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Awards,
    Cash,
}

/// Which award inventory counts: classic reward seats only, or any
/// bookable inventory including points-plus-pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityMode {
    #[default]
    Rewards,
    Any,
}

/// One directional search window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub origin: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
}

impl Leg {
    pub fn validate(&self) -> Result<(), String> {
        for code in [&self.origin, &self.destination] {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(format!("'{}' is not a valid IATA airport code", code));
            }
        }
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d")
            .map_err(|_| format!("invalid start date '{}'", self.start_date))?;
        let end = NaiveDate::parse_from_str(&self.end_date, "%Y-%m-%d")
            .map_err(|_| format!("invalid end date '{}'", self.end_date))?;
        let span = (end - start).num_days();
        if span < 0 {
            return Err(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            ));
        }
        if span > MAX_LEG_WINDOW_DAYS {
            return Err(format!(
                "date window {}..{} exceeds {} days",
                self.start_date, self.end_date, MAX_LEG_WINDOW_DAYS
            ));
        }
        Ok(())
    }
}

/// Canonical per-(date, cabin) availability produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFlight {
    pub date: String,
    pub cabin: String,
    pub mileage_cost: u64,
    pub remaining_seats: i64,
    pub is_direct: bool,
    pub airlines: String,
    pub tax_currency: Option<String>,
    pub tax_amount: f64,
}

/// Cheapest combined round trip observed for one cabin (award channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowestRecord {
    pub points: u64,
    pub outbound_date: String,
    pub return_date: String,
    pub seen_at: DateTime<Utc>,
    pub total_taxes: f64,
    pub tax_currency: String,
    pub is_direct: bool,
}

/// Cheapest cash fare observed for one cabin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRecord {
    pub aud: f64,
    pub outbound_date: String,
    pub return_date: String,
    #[serde(default)]
    pub is_direct: bool,
    pub seen_at: DateTime<Utc>,
}

/// One batch of alert lines queued for the external notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAlert {
    pub monitor_id: String,
    pub monitor_label: String,
    pub messages: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A tracked round-trip route. Unit of refresh, persistence and alerting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: String,
    pub label: String,
    pub cabins: Vec<String>,
    pub channel: Channel,
    #[serde(default)]
    pub mode: AvailabilityMode,
    pub outbound: Leg,
    #[serde(rename = "return")]
    pub return_leg: Leg,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,

    // Award tracking state, keyed by cabin code.
    #[serde(default)]
    pub current_outbound: Vec<NormalizedFlight>,
    #[serde(default)]
    pub current_return: Vec<NormalizedFlight>,
    #[serde(default)]
    pub current: HashMap<String, LowestRecord>,
    #[serde(default)]
    pub lowest: HashMap<String, LowestRecord>,

    // Cash tracking state, keyed by cabin code.
    #[serde(default)]
    pub cash_current: HashMap<String, CashRecord>,
    #[serde(default)]
    pub cash_lowest: HashMap<String, CashRecord>,
    #[serde(default)]
    pub cash_pending: bool,
    #[serde(default)]
    pub cash_requested_at: Option<DateTime<Utc>>,
    // Bumped on every tracking reset so a stale checker result
    // cannot be applied to a newer epoch.
    #[serde(default)]
    pub cash_request_id: u64,

    /// Every date|cabin|direction combination ever seen available
    /// within the current tracking epoch.
    #[serde(default)]
    pub known_slots: HashSet<String>,
}

impl Monitor {
    pub fn new(
        label: String,
        cabins: Vec<String>,
        channel: Channel,
        mode: AvailabilityMode,
        outbound: Leg,
        return_leg: Leg,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label,
            cabins,
            channel,
            mode,
            outbound,
            return_leg,
            created_at: Utc::now(),
            last_checked_at: None,
            current_outbound: Vec::new(),
            current_return: Vec::new(),
            current: HashMap::new(),
            lowest: HashMap::new(),
            cash_current: HashMap::new(),
            cash_lowest: HashMap::new(),
            cash_pending: false,
            cash_requested_at: None,
            cash_request_id: 0,
            known_slots: HashSet::new(),
        }
    }

    /// Drop every piece of tracking state and start a fresh epoch.
    pub fn reset_tracking(&mut self) {
        self.current_outbound.clear();
        self.current_return.clear();
        self.current.clear();
        self.lowest.clear();
        self.cash_current.clear();
        self.cash_lowest.clear();
        self.known_slots.clear();
        self.last_checked_at = None;
        self.cash_pending = false;
        self.cash_requested_at = None;
        self.cash_request_id += 1;
    }
}
