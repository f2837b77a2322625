//! Metered external-data acquisition.
//!
//! One generic state machine ([`AcquisitionService`]) instantiated per
//! upstream provider. Each instance owns its cache and budget ledger and
//! reports into the shared feed health monitor.

pub mod error;
pub mod normalize;
pub mod provider;
pub mod service;
pub mod types;

pub use error::ProviderError;
pub use provider::{FeedPayload, MeteredProvider, RequestParams};
pub use service::{AcquisitionService, ServiceSettings};
pub use types::{Acquired, AcquisitionOutcome, ConsumePolicy};
