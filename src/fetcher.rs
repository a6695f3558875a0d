// src/fetcher.rs
// Leg Fetcher: one award-search API query per route leg.

use std::env;
use std::fs;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::errors::EngineError;
use crate::normalizer::normalize_flights;
use crate::types::{AvailabilityMode, Leg, NormalizedFlight};

/// Carrier source filter applied to every search.
pub const DEFAULT_SOURCE: &str = "qantas";

const FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_API_URL: &str = "https://seats.aero/partnerapi";
const DEFAULT_API_KEY_FILE: &str = "secrets/award_api_key";

pub struct LegFetcher {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl LegFetcher {
    pub fn from_env() -> Self {
        let base_url =
            env::var("AWARD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = read_api_key();
        if api_key.is_empty() {
            warn!("🔑 [FETCHER] No award API key configured - award refreshes will fail");
        }
        Self {
            client: HttpClient::new(),
            base_url,
            api_key,
        }
    }

    /// Fetch and normalize one leg. A timeout or non-success status fails
    /// the whole call; the caller must treat the leg as unavailable for
    /// this cycle rather than partially available.
    pub async fn fetch_leg(
        &self,
        leg: &Leg,
        cabins: &[String],
        mode: AvailabilityMode,
    ) -> Result<Vec<NormalizedFlight>, EngineError> {
        let url = format!("{}/search", self.base_url);
        let cabin_param = cabins.join(",");

        debug!(
            "🔎 [FETCHER] Searching {} -> {} ({}..{}) cabins={}",
            leg.origin, leg.destination, leg.start_date, leg.end_date, cabin_param
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("origin_airport", leg.origin.as_str()),
                ("destination_airport", leg.destination.as_str()),
                ("start_date", leg.start_date.as_str()),
                ("end_date", leg.end_date.as_str()),
                ("source", DEFAULT_SOURCE),
                ("cabin", cabin_param.as_str()),
                ("order_by", "lowest_mileage"),
            ])
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "[FETCHER] Award search {} -> {} failed with status {}",
                leg.origin, leg.destination, status
            );
            return Err(EngineError::ApiStatus(status));
        }

        let body: Value = response.json().await?;
        let records = body
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        debug!(
            "🔎 [FETCHER] {} -> {}: {} raw day record(s)",
            leg.origin,
            leg.destination,
            records.len()
        );
        Ok(normalize_flights(&records, cabins, mode))
    }
}

fn read_api_key() -> String {
    if let Ok(key) = env::var("AWARD_API_KEY") {
        return key.trim().to_string();
    }
    let path =
        env::var("AWARD_API_KEY_FILE").unwrap_or_else(|_| DEFAULT_API_KEY_FILE.to_string());
    match fs::read_to_string(&path) {
        Ok(contents) => contents.trim().to_string(),
        Err(e) => {
            warn!("🔑 [FETCHER] Could not read API key from {}: {}", path, e);
            String::new()
        }
    }
}
