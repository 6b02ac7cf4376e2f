use super::ledger::OrderLedger;
use crate::config::ReconciliationConfig;
use crate::domain::ports::IntentStoreBox;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;

/// Failure reason recorded on intents whose callback never arrived.
pub const SESSION_EXPIRED: &str = "gateway session expired";

/// Background reconciliation pass: sessions that saw no callback within the
/// timeout are moved to `Failed`, so no intent lingers without a verdict.
pub struct SessionSweeper {
    intents: IntentStoreBox,
    ledger: Arc<OrderLedger>,
    session_timeout: Duration,
    sweep_interval: Duration,
}

impl SessionSweeper {
    pub fn new(intents: IntentStoreBox, ledger: Arc<OrderLedger>, config: &ReconciliationConfig) -> Self {
        Self {
            intents,
            ledger,
            session_timeout: config.session_timeout(),
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Runs one pass as of `now`; returns how many intents were failed.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize> {
        let timeout = chrono::Duration::from_std(self.session_timeout)
            .map_err(|e| PaymentError::ConfigError(format!("session timeout out of range: {}", e)))?;
        let stale = self.intents.stale_sessions(now - timeout).await?;

        let mut swept = 0;
        for intent in stale {
            match self.ledger.mark_failed(&intent.intent_id, SESSION_EXPIRED).await {
                Ok(_) => swept += 1,
                // Verdict landed between the scan and the write.
                Err(PaymentError::IntentAlreadyFinalized { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        if swept > 0 {
            tracing::info!(swept, "Expired gateway sessions reconciled");
        }
        Ok(swept)
    }

    /// Sweeps on a fixed interval until `shutdown` flips to `true`.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.sweep_interval);
        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            timeout_secs = self.session_timeout.as_secs(),
            "Session sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once(Utc::now()).await {
                        tracing::error!(error = %e, "Session sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Session sweeper stopped");
    }
}
