use clap::Parser;

/// Skyweave feeds CLI arguments. Each flag overrides its environment variable.
#[derive(Debug, Default, Parser)]
#[command(
    name = "skyweave-feeds",
    version,
    about = "Budgeted fare and local-event feeds for the airline dashboard"
)]
pub struct Cli {
    /// Upstream search API base URL
    #[arg(long)]
    pub serpapi_base_url: Option<String>,

    /// Budget ledger storage (e.g. sqlite://skyweave_feeds.db)
    #[arg(long)]
    pub storage_url: Option<String>,

    /// HTTP bind address
    #[arg(long)]
    pub bind: Option<String>,

    /// Watch-list polling interval in seconds
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Daily fare search ceiling
    #[arg(long)]
    pub fares_daily_limit: Option<u32>,

    /// Daily event search ceiling
    #[arg(long)]
    pub events_daily_limit: Option<u32>,

    /// Charge the budget for failed fetches too
    #[arg(long)]
    pub consume_on_failure: bool,

    /// Start the HTTP API without the polling scheduler
    #[arg(long)]
    pub no_scheduler: bool,
}
