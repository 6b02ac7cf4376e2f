use crate::config::GatewayConfig;
use crate::domain::intent::{BuyerId, IntentId, PurchaseIntent};
use crate::domain::money::{Amount, Currency};
use crate::domain::ports::{IntentStoreBox, PaymentGatewayBox};
use crate::domain::session::{GatewaySession, SessionId, SessionRequest};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use std::time::Duration;

/// Bounded exponential backoff for `GatewayUnreachable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Checkout request as received from the buyer's device.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    /// Client-generated idempotency key; a fresh one is minted when absent.
    pub intent_id: Option<IntentId>,
    pub buyer_id: BuyerId,
    pub item_descriptor: String,
    pub amount_minor_units: i64,
    pub currency: String,
}

/// Assembles purchase intents and opens their gateway sessions.
pub struct IntentBuilder {
    intents: IntentStoreBox,
    gateway: PaymentGatewayBox,
    retry: RetryPolicy,
}

impl IntentBuilder {
    pub fn new(intents: IntentStoreBox, gateway: PaymentGatewayBox, retry: RetryPolicy) -> Self {
        Self {
            intents,
            gateway,
            retry,
        }
    }

    /// Creates a pending purchase in `Created` state.
    ///
    /// Re-sending the same intent id returns the stored intent, so a retried
    /// request never yields a second purchase.
    pub async fn create_intent(&self, request: IntentRequest) -> Result<PurchaseIntent> {
        let amount = Amount::new(request.amount_minor_units)?;
        let currency = Currency::new(&request.currency)?;
        let item = request.item_descriptor.trim();
        if item.is_empty() {
            return Err(PaymentError::ValidationError(
                "Item descriptor must not be empty".to_string(),
            ));
        }

        let intent = PurchaseIntent::new(
            request.intent_id.unwrap_or_else(IntentId::generate),
            request.buyer_id.clone(),
            item.to_string(),
            amount,
            currency,
            Utc::now(),
        );
        let stored = self.intents.insert(intent).await?;
        if stored.buyer_id != request.buyer_id {
            return Err(PaymentError::IdempotencyKeyReused(stored.intent_id));
        }

        tracing::info!(
            intent_id = %stored.intent_id,
            buyer_id = %stored.buyer_id,
            amount = stored.amount_minor_units.minor_units(),
            currency = %stored.currency,
            "Purchase intent created"
        );
        Ok(stored)
    }

    /// Opens (or returns the already open) gateway session for an intent.
    pub async fn open_gateway_session(&self, intent_id: &IntentId) -> Result<GatewaySession> {
        let intent = self
            .intents
            .get(intent_id)
            .await?
            .ok_or(PaymentError::IntentNotFound(*intent_id))?;

        if intent.status.is_terminal() {
            return Err(intent.finalized_error());
        }
        if let Some(session) = intent.session {
            return Ok(session);
        }

        let request = SessionRequest {
            amount: intent.amount_minor_units,
            currency: intent.currency.clone(),
            receipt: intent.intent_id,
        };
        let session_id = self.request_session(&request).await?;
        let session = GatewaySession {
            session_id,
            intent_id: intent.intent_id,
            amount_minor_units: intent.amount_minor_units,
            currency: intent.currency,
            opened_at: Utc::now(),
        };

        // A concurrent open may have bound its session first; the stored one wins.
        let updated = self
            .intents
            .update(
                intent_id,
                Box::new(move |intent: &mut PurchaseIntent| {
                    intent.attach_session(session, Utc::now()).map(|_| ())
                }),
            )
            .await?;

        let session = updated.session.ok_or_else(|| {
            PaymentError::StorageError(format!("session for intent {} was not stored", intent_id))
        })?;
        tracing::info!(
            intent_id = %intent_id,
            session_id = %session.session_id,
            "Gateway session open"
        );
        Ok(session)
    }

    async fn request_session(&self, request: &SessionRequest) -> Result<SessionId> {
        let mut attempt = 0;
        loop {
            match self.gateway.open_session(request).await {
                Ok(session_id) => return Ok(session_id),
                Err(PaymentError::GatewayUnreachable(reason)) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        intent_id = %request.receipt,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "Gateway unreachable, retrying session open"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
