// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod acquisition;
pub mod api;
pub mod budget;
pub mod cache;
pub mod clock;
pub mod context;
pub mod db;
pub mod error;
pub mod feed_health;
pub mod metrics;
pub mod scheduler;
pub mod services;
pub mod signals;
pub mod storage;
pub mod store;

// These modules are only needed by the binary.
// Declared pub so integration tests can reach them if needed.
pub mod cli;
pub mod config;
pub mod logging;
