use std::env;
use std::fmt;
use std::str::FromStr;

use crate::acquisition::ConsumePolicy;
use crate::cli::Cli;
use crate::feed_health::FreshnessThresholds;
use crate::services::events::EventQuery;
use crate::services::fares::FareQuery;
use crate::services::serpapi::DEFAULT_BASE_URL;
use crate::signals::FareDropThresholds;

pub const DEFAULT_STORAGE_URL: &str = "sqlite://skyweave_feeds.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// One year.
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;
pub const MAX_HTTP_TIMEOUT_SECONDS: u64 = 60 * 60;
pub const MAX_POLL_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct Config {
    pub serpapi_key: String,
    pub serpapi_base_url: String,
    pub storage_url: String,
    pub fares_daily_limit: u32,
    pub events_daily_limit: u32,
    pub fares_ttl_seconds: u64,
    pub events_ttl_seconds: u64,
    pub http_timeout_seconds: u64,
    pub consume_policy: ConsumePolicy,
    pub freshness: FreshnessThresholds,
    pub fare_drop: FareDropThresholds,
    pub poll_interval_seconds: u64,
    pub watch: WatchList,
    pub bind_addr: String,
}

/// Routes and airports the scheduler keeps warm.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchList {
    pub routes: Vec<FareQuery>,
    pub airports: Vec<EventQuery>,
}

impl WatchList {
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.airports.is_empty()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("serpapi_key", &if self.serpapi_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("serpapi_base_url", &self.serpapi_base_url)
            .field("storage_url", &self.storage_url)
            .field("fares_daily_limit", &self.fares_daily_limit)
            .field("events_daily_limit", &self.events_daily_limit)
            .field("fares_ttl_seconds", &self.fares_ttl_seconds)
            .field("events_ttl_seconds", &self.events_ttl_seconds)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .field("consume_policy", &self.consume_policy)
            .field("freshness", &self.freshness)
            .field("fare_drop", &self.fare_drop)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("watched_routes", &self.watch.routes.len())
            .field("watched_airports", &self.watch.airports.len())
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Unset and blank variables take
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let consume_policy = if parse_bool(&var, "CONSUME_BUDGET_ON_FAILURE", false)? {
            ConsumePolicy::OnAttempt
        } else {
            ConsumePolicy::OnSuccess
        };

        let freshness = FreshnessThresholds {
            live_secs: parse_or(&var, "FEED_LIVE_SECONDS", 30)?,
            aging_secs: parse_or(&var, "FEED_AGING_SECONDS", 120)?,
        };

        let fare_drop = FareDropThresholds {
            warning_pct: parse_or(&var, "FARE_DROP_WARNING_PCT", FareDropThresholds::default().warning_pct)?,
            critical_pct: parse_or(&var, "FARE_DROP_CRITICAL_PCT", FareDropThresholds::default().critical_pct)?,
        };

        let watch = WatchList {
            routes: parse_routes(var("WATCH_ROUTES").as_deref().unwrap_or_default())?,
            airports: parse_airports(var("WATCH_AIRPORTS").as_deref().unwrap_or_default())?,
        };

        let config = Self {
            serpapi_key: var("SERPAPI_KEY").unwrap_or_default(),
            serpapi_base_url: var("SERPAPI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            storage_url: var("STORAGE_URL").unwrap_or_else(|| DEFAULT_STORAGE_URL.to_string()),
            fares_daily_limit: parse_or(&var, "FARES_DAILY_LIMIT", 500)?,
            events_daily_limit: parse_or(&var, "EVENTS_DAILY_LIMIT", 100)?,
            fares_ttl_seconds: parse_or(&var, "FARES_TTL_SECONDS", 900)?,
            events_ttl_seconds: parse_or(&var, "EVENTS_TTL_SECONDS", 3600)?,
            http_timeout_seconds: parse_or(&var, "HTTP_TIMEOUT_SECONDS", 30)?,
            consume_policy,
            freshness,
            fare_drop,
            poll_interval_seconds: parse_or(&var, "POLL_INTERVAL_SECONDS", 300)?,
            watch,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), String> {
        if let Some(url) = &cli.serpapi_base_url {
            self.serpapi_base_url = url.clone();
        }
        if let Some(url) = &cli.storage_url {
            self.storage_url = url.clone();
        }
        if let Some(addr) = &cli.bind {
            self.bind_addr = addr.clone();
        }
        if let Some(secs) = cli.poll_interval {
            self.poll_interval_seconds = secs;
        }
        if let Some(limit) = cli.fares_daily_limit {
            self.fares_daily_limit = limit;
        }
        if let Some(limit) = cli.events_daily_limit {
            self.events_daily_limit = limit;
        }
        if cli.consume_on_failure {
            self.consume_policy = ConsumePolicy::OnAttempt;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), String> {
        if self.poll_interval_seconds == 0 {
            return Err("POLL_INTERVAL_SECONDS must be greater than zero".into());
        }
        if self.poll_interval_seconds > MAX_POLL_INTERVAL_SECONDS {
            return Err(format!(
                "POLL_INTERVAL_SECONDS must be at most {}",
                MAX_POLL_INTERVAL_SECONDS
            ));
        }
        for (name, ttl) in [
            ("FARES_TTL_SECONDS", self.fares_ttl_seconds),
            ("EVENTS_TTL_SECONDS", self.events_ttl_seconds),
        ] {
            if ttl == 0 || ttl > MAX_TTL_SECONDS {
                return Err(format!("{} must be between 1 and {}", name, MAX_TTL_SECONDS));
            }
        }
        if self.http_timeout_seconds == 0 || self.http_timeout_seconds > MAX_HTTP_TIMEOUT_SECONDS {
            return Err(format!(
                "HTTP_TIMEOUT_SECONDS must be between 1 and {}",
                MAX_HTTP_TIMEOUT_SECONDS
            ));
        }
        if self.freshness.live_secs < 0 || self.freshness.aging_secs < self.freshness.live_secs {
            return Err("FEED_AGING_SECONDS must be at least FEED_LIVE_SECONDS".into());
        }
        if self.freshness.aging_secs > MAX_TTL_SECONDS as i64 {
            return Err(format!("FEED_AGING_SECONDS must be at most {}", MAX_TTL_SECONDS));
        }
        if self.fare_drop.critical_pct < self.fare_drop.warning_pct {
            return Err("FARE_DROP_CRITICAL_PCT must be at least FARE_DROP_WARNING_PCT".into());
        }
        Ok(())
    }
}

fn parse_or<T, F>(var: &F, name: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

fn parse_bool<F>(var: &F, name: &str, default: bool) -> Result<bool, String>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(format!("{} must be true or false, got '{}'", name, other)),
    }
}

/// `ORIG-DEST@YYYY-MM-DD`, comma separated.
fn parse_routes(raw: &str) -> Result<Vec<FareQuery>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (route, date) = item
                .split_once('@')
                .ok_or_else(|| format!("WATCH_ROUTES entry '{}' must look like MIA-JFK@2026-11-01", item))?;
            let (origin, destination) = route
                .split_once('-')
                .ok_or_else(|| format!("WATCH_ROUTES entry '{}' must look like MIA-JFK@2026-11-01", item))?;
            FareQuery::new(origin, destination, date).map_err(|e| format!("WATCH_ROUTES: {}", e))
        })
        .collect()
}

fn parse_airports(raw: &str) -> Result<Vec<EventQuery>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|code| EventQuery::new(code).map_err(|e| format!("WATCH_AIRPORTS: {}", e)))
        .collect()
}
