//! Local events provider (Google Events via SerpAPI).

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fares::iata_code;
use super::serpapi::SerpApiClient;
use crate::acquisition::normalize::{array, as_text, expect_object, number, path, string, unsigned};
use crate::acquisition::provider::{FeedPayload, MeteredProvider, ProviderResult, RequestParams};
use crate::error::AppError;

/// Search phrase for airports served by the network.
const AIRPORT_CITIES: &[(&str, &str)] = &[
    ("MIA", "Miami"),
    ("FLL", "Fort Lauderdale"),
    ("MCO", "Orlando"),
    ("TPA", "Tampa"),
    ("JFK", "New York"),
    ("EWR", "Newark"),
    ("LGA", "New York"),
    ("BOS", "Boston"),
    ("ORD", "Chicago"),
    ("LAX", "Los Angeles"),
    ("SFO", "San Francisco"),
    ("DFW", "Dallas"),
    ("ATL", "Atlanta"),
    ("DEN", "Denver"),
    ("LAS", "Las Vegas"),
    ("PHX", "Phoenix"),
    ("SEA", "Seattle"),
    ("DTW", "Detroit"),
    ("MSP", "Minneapolis"),
    ("SJU", "Puerto Rico"),
    ("CUN", "Cancun"),
    ("PUJ", "Punta Cana"),
    ("NAS", "Bahamas"),
    ("SXM", "St Maarten"),
    ("MBJ", "Jamaica"),
    ("AUA", "Aruba"),
    ("SJO", "Costa Rica"),
    ("PVR", "Puerto Vallarta"),
    ("SJD", "Cabo San Lucas"),
    ("CZM", "Cozumel"),
];

/// City name used in event searches; unknown codes search by code.
pub fn city_for_airport(code: &str) -> &str {
    AIRPORT_CITIES
        .iter()
        .find(|(iata, _)| iata.eq_ignore_ascii_case(code))
        .map(|(_, city)| *city)
        .unwrap_or(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    #[default]
    Events,
    Concerts,
    Sports,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Events => "events",
            EventCategory::Concerts => "concerts",
            EventCategory::Sports => "sports",
        }
    }

    fn search_phrase(&self, city: &str) -> String {
        match self {
            EventCategory::Events => format!("Events in {}", city),
            EventCategory::Concerts => format!("Concerts in {}", city),
            EventCategory::Sports => format!("Sports events in {}", city),
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "events" => Ok(EventCategory::Events),
            "concerts" => Ok(EventCategory::Concerts),
            "sports" => Ok(EventCategory::Sports),
            other => Err(AppError::InvalidInput(format!(
                "Unknown event category '{}', expected events, concerts or sports",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub airport: String,
    pub category: EventCategory,
}

impl EventQuery {
    pub fn new(airport: &str) -> Result<Self, AppError> {
        Self::with_category(airport, EventCategory::Events)
    }

    pub fn with_category(airport: &str, category: EventCategory) -> Result<Self, AppError> {
        Ok(Self {
            airport: iata_code(airport)?,
            category,
        })
    }
}

impl RequestParams for EventQuery {
    fn cache_key(&self) -> String {
        match self.category {
            EventCategory::Events => self.airport.clone(),
            other => format!("{}:{}", self.airport, other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub title: String,
    pub start_date: Option<String>,
    /// Human-readable schedule, e.g. "Sat, Nov 14, 8 – 11 PM".
    pub when: Option<String>,
    pub venue: Option<String>,
    pub venue_rating: Option<f64>,
    pub venue_reviews: Option<u32>,
    pub address: Option<String>,
    pub link: Option<String>,
}

/// Normalized event listing. The default value is the "no data" shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsSnapshot {
    pub airport: String,
    pub city: String,
    pub category: EventCategory,
    pub events: Vec<LocalEvent>,
}

impl FeedPayload for EventsSnapshot {
    fn record_count(&self) -> usize {
        self.events.len()
    }
}

pub struct EventsProvider {
    client: SerpApiClient,
}

impl EventsProvider {
    pub fn new(client: SerpApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MeteredProvider for EventsProvider {
    type Params = EventQuery;
    type Payload = EventsSnapshot;

    fn provider_name(&self) -> &str {
        "Google Events"
    }

    async fn fetch(&self, params: &EventQuery) -> ProviderResult<Value> {
        let city = city_for_airport(&params.airport);
        self.client
            .search(&[
                ("engine", "google_events".to_string()),
                ("q", params.category.search_phrase(city)),
                ("hl", "en".to_string()),
                ("gl", "us".to_string()),
            ])
            .await
    }

    fn normalize(&self, params: &EventQuery, raw: Value) -> ProviderResult<EventsSnapshot> {
        expect_object(&raw)?;

        let events = array(&raw, "events_results")
            .iter()
            .filter_map(local_event)
            .collect();

        Ok(EventsSnapshot {
            airport: params.airport.clone(),
            city: city_for_airport(&params.airport).to_string(),
            category: params.category,
            events,
        })
    }
}

/// Events without a title are dropped.
fn local_event(raw: &Value) -> Option<LocalEvent> {
    let title = string(raw, "title")?;

    let address = {
        let lines: Vec<String> = array(raw, "address").iter().filter_map(as_text).collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join(", "))
        }
    };

    let venue = raw.get("venue");

    Some(LocalEvent {
        title,
        start_date: path(raw, &["date", "start_date"]).and_then(as_text),
        when: path(raw, &["date", "when"]).and_then(as_text),
        venue: venue.and_then(|v| string(v, "name")),
        venue_rating: venue.and_then(|v| number(v, "rating")),
        venue_reviews: venue.and_then(|v| unsigned(v, "reviews")),
        address,
        link: string(raw, "link"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn provider() -> EventsProvider {
        let client = SerpApiClient::new(
            "http://localhost".into(),
            "k".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        EventsProvider::new(client)
    }

    #[test]
    fn cache_key_is_airport_for_default_category() {
        assert_eq!(EventQuery::new("mia").unwrap().cache_key(), "MIA");
        assert_eq!(
            EventQuery::with_category("MIA", EventCategory::Sports)
                .unwrap()
                .cache_key(),
            "MIA:sports"
        );
    }

    #[test]
    fn city_lookup_falls_back_to_code() {
        assert_eq!(city_for_airport("mco"), "Orlando");
        assert_eq!(city_for_airport("XYZ"), "XYZ");
    }

    #[test]
    fn category_parses() {
        assert_eq!("Concerts".parse::<EventCategory>().unwrap(), EventCategory::Concerts);
        assert!("theatre".parse::<EventCategory>().is_err());
    }

    #[test]
    fn normalize_reads_venue_and_schedule() {
        let body = json!({
            "events_results": [
                {
                    "title": "Miami Heat vs. Boston Celtics",
                    "date": { "start_date": "Nov 14", "when": "Sat, Nov 14, 7:30 PM" },
                    "address": ["Kaseya Center, 601 Biscayne Blvd", "Miami, FL"],
                    "link": "https://example.com/heat",
                    "venue": { "name": "Kaseya Center", "rating": 4.6, "reviews": 21034 }
                },
                { "date": { "when": "no title, dropped" } },
                { "title": "Open mic", "venue": "not an object" }
            ]
        });

        let snapshot = provider()
            .normalize(&EventQuery::new("MIA").unwrap(), body)
            .unwrap();

        assert_eq!(snapshot.airport, "MIA");
        assert_eq!(snapshot.city, "Miami");
        assert_eq!(snapshot.events.len(), 2);

        let game = &snapshot.events[0];
        assert_eq!(game.venue.as_deref(), Some("Kaseya Center"));
        assert_eq!(game.venue_reviews, Some(21034));
        assert_eq!(game.venue_rating, Some(4.6));
        assert_eq!(game.when.as_deref(), Some("Sat, Nov 14, 7:30 PM"));
        assert_eq!(
            game.address.as_deref(),
            Some("Kaseya Center, 601 Biscayne Blvd, Miami, FL")
        );

        let open_mic = &snapshot.events[1];
        assert_eq!(open_mic.venue, None);
        assert_eq!(open_mic.venue_reviews, None);
    }

    #[test]
    fn normalize_without_results_is_empty() {
        let snapshot = provider()
            .normalize(&EventQuery::new("LAS").unwrap(), json!({ "search_metadata": {} }))
            .unwrap();
        assert!(snapshot.events.is_empty());
        assert_eq!(snapshot.city, "Las Vegas");
    }
}
