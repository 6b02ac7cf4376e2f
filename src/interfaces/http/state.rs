//! Application state for API handlers

use crate::application::correlator::LocationCorrelator;
use crate::application::intents::IntentBuilder;
use crate::application::ledger::OrderLedger;
use crate::application::verifier::ClaimVerifier;
use crate::domain::ports::IntentStoreBox;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub intents: IntentStoreBox,
    pub builder: Arc<IntentBuilder>,
    pub verifier: Arc<ClaimVerifier>,
    pub ledger: Arc<OrderLedger>,
    pub correlator: Arc<LocationCorrelator>,

    /// Service version reported by `/health`
    pub version: String,

    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        intents: IntentStoreBox,
        builder: Arc<IntentBuilder>,
        verifier: Arc<ClaimVerifier>,
        ledger: Arc<OrderLedger>,
        correlator: Arc<LocationCorrelator>,
    ) -> Self {
        Self {
            intents,
            builder,
            verifier,
            ledger,
            correlator,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds().max(0);
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
