//! Competitive fare provider (Google Flights via SerpAPI).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::serpapi::SerpApiClient;
use crate::acquisition::normalize::{array, as_text, expect_object, number, path, string, unsigned};
use crate::acquisition::provider::{FeedPayload, MeteredProvider, ProviderResult, RequestParams};
use crate::error::AppError;

/// One-way fare search for a route and departure date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareQuery {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
}

impl FareQuery {
    pub fn new(origin: &str, destination: &str, date: &str) -> Result<Self, AppError> {
        let origin = iata_code(origin)?;
        let destination = iata_code(destination)?;
        if origin == destination {
            return Err(AppError::InvalidInput(format!(
                "Origin and destination are both {}",
                origin
            )));
        }
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::InvalidInput(format!("Invalid date '{}', expected YYYY-MM-DD", date))
        })?;

        Ok(Self {
            origin,
            destination,
            date,
        })
    }

    pub fn route(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

impl RequestParams for FareQuery {
    fn cache_key(&self) -> String {
        format!("{}-{}-{}", self.origin, self.destination, self.date)
    }
}

/// Validate and upper-case a three-letter airport code.
pub fn iata_code(raw: &str) -> Result<String, AppError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(AppError::InvalidInput(format!(
            "Invalid airport code '{}', expected 3 letters",
            raw
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareOption {
    pub airline: String,
    pub price: f64,
    pub stops: u32,
    pub duration_minutes: Option<u32>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub is_best: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlineFareSummary {
    pub min_fare: f64,
    pub max_fare: f64,
    pub avg_fare: f64,
    pub flight_count: usize,
}

/// Normalized fare search result. The default value is the "no data" shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FareSnapshot {
    pub route: String,
    pub date: String,
    /// Lowest price across every option.
    pub min_fare: Option<f64>,
    pub options: Vec<FareOption>,
    pub airline_fares: BTreeMap<String, AirlineFareSummary>,
    pub total_options: usize,
    /// Upstream's own low/typical/high verdict, when given.
    pub price_level: Option<String>,
}

impl FeedPayload for FareSnapshot {
    fn record_count(&self) -> usize {
        self.total_options
    }
}

pub struct FareProvider {
    client: SerpApiClient,
}

impl FareProvider {
    pub fn new(client: SerpApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MeteredProvider for FareProvider {
    type Params = FareQuery;
    type Payload = FareSnapshot;

    fn provider_name(&self) -> &str {
        "Google Flights"
    }

    async fn fetch(&self, params: &FareQuery) -> ProviderResult<Value> {
        self.client
            .search(&[
                ("engine", "google_flights".to_string()),
                ("departure_id", params.origin.clone()),
                ("arrival_id", params.destination.clone()),
                ("outbound_date", params.date.to_string()),
                ("type", "2".to_string()),
                ("currency", "USD".to_string()),
                ("hl", "en".to_string()),
                ("adults", "1".to_string()),
            ])
            .await
    }

    fn normalize(&self, params: &FareQuery, raw: Value) -> ProviderResult<FareSnapshot> {
        expect_object(&raw)?;

        let best = array(&raw, "best_flights").iter().map(|f| (f, true));
        let other = array(&raw, "other_flights").iter().map(|f| (f, false));
        let options: Vec<FareOption> = best
            .chain(other)
            .filter_map(|(flight, is_best)| fare_option(flight, is_best))
            .collect();

        let min_fare = options.iter().map(|o| o.price).reduce(f64::min);
        let airline_fares = summarize_by_airline(&options);
        let price_level = path(&raw, &["price_insights", "price_level"]).and_then(as_text);

        Ok(FareSnapshot {
            route: params.route(),
            date: params.date.to_string(),
            min_fare,
            total_options: options.len(),
            options,
            airline_fares,
            price_level,
        })
    }
}

/// Options without a usable price are dropped; other missing fields fall
/// back to `Unknown` / `None` / zero stops.
fn fare_option(flight: &Value, is_best: bool) -> Option<FareOption> {
    let price = number(flight, "price").filter(|p| *p > 0.0)?;
    let legs = array(flight, "flights");

    let airline = legs
        .first()
        .and_then(|leg| string(leg, "airline"))
        .unwrap_or_else(|| "Unknown".to_string());
    let departure_time = legs
        .first()
        .and_then(|leg| path(leg, &["departure_airport", "time"]))
        .and_then(as_text);
    let arrival_time = legs
        .last()
        .and_then(|leg| path(leg, &["arrival_airport", "time"]))
        .and_then(as_text);

    Some(FareOption {
        airline,
        price,
        stops: legs.len().saturating_sub(1) as u32,
        duration_minutes: unsigned(flight, "total_duration"),
        departure_time,
        arrival_time,
        is_best,
    })
}

fn summarize_by_airline(options: &[FareOption]) -> BTreeMap<String, AirlineFareSummary> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for option in options {
        grouped
            .entry(option.airline.clone())
            .or_default()
            .push(option.price);
    }

    grouped
        .into_iter()
        .map(|(airline, prices)| {
            let min_fare = prices.iter().copied().fold(f64::INFINITY, f64::min);
            let max_fare = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg_fare = prices.iter().sum::<f64>() / prices.len() as f64;
            (
                airline,
                AirlineFareSummary {
                    min_fare,
                    max_fare,
                    avg_fare,
                    flight_count: prices.len(),
                },
            )
        })
        .collect()
}
