use super::intents::{IntentBuilder, IntentRequest};
use super::ledger::OrderLedger;
use super::verifier::{ClaimVerifier, Verdict};
use crate::domain::intent::IntentId;
use crate::domain::order::OrderId;
use crate::domain::ports::{GatewayEvent, PaymentSheetBox};
use crate::error::Result;
use std::sync::Arc;

/// Shown to the buyer when they close the payment sheet.
pub const CANCELLED_BY_BUYER: &str = "Payment was cancelled";

/// What the buyer is told once a checkout attempt settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Succeeded { order_id: OrderId },
    Failed { reason: String },
    Cancelled { reason: String },
}

/// One settled attempt: the intent it ran under and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutAttempt {
    pub intent_id: IntentId,
    pub outcome: CheckoutOutcome,
}

impl CheckoutAttempt {
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self.outcome, CheckoutOutcome::Failed { .. })
    }
}

/// Drives one purchase through intent, gateway sheet, and verification.
///
/// Every attempt mints a fresh intent id. A failed or cancelled intent is
/// never reused, so starting over is simply another call to [`CheckoutFlow::checkout`].
pub struct CheckoutFlow {
    builder: Arc<IntentBuilder>,
    verifier: Arc<ClaimVerifier>,
    ledger: Arc<OrderLedger>,
    sheet: PaymentSheetBox,
}

impl CheckoutFlow {
    pub fn new(
        builder: Arc<IntentBuilder>,
        verifier: Arc<ClaimVerifier>,
        ledger: Arc<OrderLedger>,
        sheet: PaymentSheetBox,
    ) -> Self {
        Self {
            builder,
            verifier,
            ledger,
            sheet,
        }
    }

    pub async fn checkout(&self, request: IntentRequest) -> Result<CheckoutAttempt> {
        let intent = self
            .builder
            .create_intent(IntentRequest {
                intent_id: Some(IntentId::generate()),
                ..request
            })
            .await?;
        let intent_id = intent.intent_id;
        let buyer_id = intent.buyer_id;
        let session = self.builder.open_gateway_session(&intent_id).await?;

        let outcome = match self.sheet.await_callback(&session).await? {
            GatewayEvent::Paid(claim) => match self.verifier.verify(&buyer_id, claim).await? {
                Verdict::Accepted(order) => CheckoutOutcome::Succeeded {
                    order_id: order.order_id,
                },
                Verdict::Rejected(reason) => CheckoutOutcome::Failed {
                    reason: reason.to_string(),
                },
            },
            GatewayEvent::Dismissed => {
                self.ledger.mark_cancelled(&intent_id).await?;
                CheckoutOutcome::Cancelled {
                    reason: CANCELLED_BY_BUYER.to_string(),
                }
            }
            GatewayEvent::Failed { description } => {
                self.ledger.mark_failed(&intent_id, &description).await?;
                CheckoutOutcome::Failed {
                    reason: description,
                }
            }
        };

        tracing::info!(intent_id = %intent_id, ?outcome, "Checkout settled");
        Ok(CheckoutAttempt { intent_id, outcome })
    }

    /// Retries failed attempts with a fresh intent each time, up to
    /// `max_attempts`. Success and cancellation end the loop immediately.
    pub async fn checkout_with_restarts(
        &self,
        request: IntentRequest,
        max_attempts: usize,
    ) -> Result<Vec<CheckoutAttempt>> {
        let mut attempts = Vec::new();
        for _ in 0..max_attempts.max(1) {
            let attempt = self.checkout(request.clone()).await?;
            let again = attempt.is_terminal_failure();
            attempts.push(attempt);
            if !again {
                break;
            }
            tracing::info!(attempts = attempts.len(), "Restarting checkout with a fresh intent");
        }
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::intents::RetryPolicy;
    use crate::application::verifier::SignatureVerifier;
    use crate::config::GatewaySecret;
    use crate::domain::intent::{BuyerId, IntentStatus};
    use crate::domain::ports::{IntentStore, OrderStore, PaymentSheet};
    use crate::domain::session::{GatewaySession, Signature, VerificationClaim};
    use crate::infrastructure::in_memory::InMemoryStore;
    use crate::infrastructure::simulated_gateway::SimulatedGateway;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Buyer {
        Pays,
        Forges,
        Dismisses,
        Declined,
    }

    /// Sheet that answers each session according to a queue of buyer actions.
    struct ScriptedSheet {
        gateway: Arc<SimulatedGateway>,
        script: Mutex<VecDeque<Buyer>>,
    }

    #[async_trait]
    impl PaymentSheet for ScriptedSheet {
        async fn await_callback(&self, session: &GatewaySession) -> Result<GatewayEvent> {
            let action = self.script.lock().await.pop_front().unwrap_or(Buyer::Dismisses);
            Ok(match action {
                Buyer::Pays => GatewayEvent::Paid(self.gateway.signed_claim(&session.session_id)),
                Buyer::Forges => {
                    let claim = self.gateway.signed_claim(&session.session_id);
                    GatewayEvent::Paid(VerificationClaim::new(
                        claim.session_id,
                        claim.gateway_payment_id,
                        Signature::new("00".repeat(32)),
                    ))
                }
                Buyer::Dismisses => GatewayEvent::Dismissed,
                Buyer::Declined => GatewayEvent::Failed {
                    description: "card declined".to_string(),
                },
            })
        }
    }

    fn flow(script: Vec<Buyer>) -> (CheckoutFlow, InMemoryStore) {
        let store = InMemoryStore::new();
        let secret = GatewaySecret::new("merchant-secret");
        let gateway = Arc::new(SimulatedGateway::new(secret.clone()));
        let ledger = Arc::new(OrderLedger::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        ));
        let builder = Arc::new(IntentBuilder::new(
            Arc::new(store.clone()),
            gateway.clone(),
            RetryPolicy::default(),
        ));
        let verifier = Arc::new(ClaimVerifier::new(
            Arc::new(store.clone()),
            ledger.clone(),
            SignatureVerifier::new(secret),
        ));
        let sheet = Arc::new(ScriptedSheet {
            gateway,
            script: Mutex::new(script.into()),
        });
        (CheckoutFlow::new(builder, verifier, ledger, sheet), store)
    }

    fn request() -> IntentRequest {
        IntentRequest {
            intent_id: None,
            buyer_id: BuyerId::new("buyer-1").unwrap(),
            item_descriptor: "Chicken Product".to_string(),
            amount_minor_units: 49900,
            currency: "INR".to_string(),
        }
    }

    #[tokio::test]
    async fn test_paid_checkout_commits_order() {
        let (flow, store) = flow(vec![Buyer::Pays]);
        let attempt = flow.checkout(request()).await.unwrap();

        let CheckoutOutcome::Succeeded { order_id } = &attempt.outcome else {
            panic!("expected success, got {:?}", attempt.outcome);
        };
        let order = store.get_by_intent(&attempt.intent_id).await.unwrap().unwrap();
        assert_eq!(&order.order_id, order_id);
        assert_eq!(order.items, vec!["Chicken Product".to_string()]);
    }

    #[tokio::test]
    async fn test_dismissed_sheet_cancels_intent() {
        let (flow, store) = flow(vec![Buyer::Dismisses]);
        let attempt = flow.checkout(request()).await.unwrap();

        assert_eq!(
            attempt.outcome,
            CheckoutOutcome::Cancelled {
                reason: "Payment was cancelled".to_string()
            }
        );
        let intent = store.get(&attempt.intent_id).await.unwrap().unwrap();
        assert_eq!(intent.status, IntentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_declined_payment_is_recorded() {
        let (flow, store) = flow(vec![Buyer::Declined]);
        let attempt = flow.checkout(request()).await.unwrap();

        assert_eq!(
            attempt.outcome,
            CheckoutOutcome::Failed {
                reason: "card declined".to_string()
            }
        );
        let intent = store.get(&attempt.intent_id).await.unwrap().unwrap();
        assert_eq!(intent.status, IntentStatus::Failed);
        assert_eq!(intent.failure_reason.as_deref(), Some("card declined"));
    }

    #[tokio::test]
    async fn test_forged_claim_restarts_with_fresh_intent() {
        let (flow, store) = flow(vec![Buyer::Forges, Buyer::Pays]);
        let attempts = flow.checkout_with_restarts(request(), 3).await.unwrap();

        assert_eq!(attempts.len(), 2);
        assert!(matches!(
            &attempts[0].outcome,
            CheckoutOutcome::Failed { reason } if reason.contains("signature")
        ));
        assert!(matches!(attempts[1].outcome, CheckoutOutcome::Succeeded { .. }));
        assert_ne!(attempts[0].intent_id, attempts[1].intent_id);

        assert!(store.get_by_intent(&attempts[0].intent_id).await.unwrap().is_none());
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_restarts() {
        let (flow, _store) = flow(vec![Buyer::Dismisses, Buyer::Pays]);
        let attempts = flow.checkout_with_restarts(request(), 3).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(matches!(
            &attempts[0].outcome,
            CheckoutOutcome::Cancelled { reason } if reason == CANCELLED_BY_BUYER
        ));
    }
}
