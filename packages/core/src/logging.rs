use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable. Keeps sqlx statement
/// logging out of the default output.
pub const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_DIRECTIVES`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Initialize structured logging for the application.
///
/// This must be called once at startup (in main.rs).
pub fn init_logging() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .compact()
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Logging initialized");
}
