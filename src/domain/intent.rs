use super::money::{Amount, Currency};
use super::session::GatewaySession;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Client-generated idempotency key threaded through the whole checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(Uuid);

impl IntentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IntentId {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| PaymentError::ValidationError(format!("Invalid intent id: {}", e)))
    }
}

/// Buyer identity as asserted by the upstream auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuyerId(String);

impl BuyerId {
    pub fn new(id: impl Into<String>) -> Result<Self, PaymentError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Buyer id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuyerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentStatus {
    Created,
    GatewaySessionOpen,
    AwaitingVerification,
    Verified,
    Failed,
    Cancelled,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Verified | IntentStatus::Failed | IntentStatus::Cancelled
        )
    }

    /// Whether the state machine defines an edge from `self` to `next`.
    pub fn can_transition_to(&self, next: IntentStatus) -> bool {
        use IntentStatus::*;
        matches!(
            (self, next),
            (Created, GatewaySessionOpen)
                | (Created, Cancelled)
                | (GatewaySessionOpen, AwaitingVerification)
                | (GatewaySessionOpen, Cancelled)
                | (GatewaySessionOpen, Failed)
                | (AwaitingVerification, Verified)
                | (AwaitingVerification, Failed)
                | (AwaitingVerification, Cancelled)
        )
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntentStatus::Created => "created",
            IntentStatus::GatewaySessionOpen => "gateway_session_open",
            IntentStatus::AwaitingVerification => "awaiting_verification",
            IntentStatus::Verified => "verified",
            IntentStatus::Failed => "failed",
            IntentStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A pending purchase and its audit trail.
///
/// Intents are never deleted; every step of the checkout is recorded as a
/// status transition on this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseIntent {
    pub intent_id: IntentId,
    pub buyer_id: BuyerId,
    pub item_descriptor: String,
    pub amount_minor_units: Amount,
    pub currency: Currency,
    pub status: IntentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<GatewaySession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseIntent {
    pub fn new(
        intent_id: IntentId,
        buyer_id: BuyerId,
        item_descriptor: String,
        amount: Amount,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            intent_id,
            buyer_id,
            item_descriptor,
            amount_minor_units: amount,
            currency,
            status: IntentStatus::Created,
            session: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the intent along the state machine.
    ///
    /// Any attempt to leave a terminal state fails with
    /// [`PaymentError::IntentAlreadyFinalized`].
    pub fn transition(&mut self, next: IntentStatus, now: DateTime<Utc>) -> Result<(), PaymentError> {
        if self.status.is_terminal() {
            return Err(self.finalized_error());
        }
        if !self.status.can_transition_to(next) {
            return Err(PaymentError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Attaches a gateway session, unless one is already attached.
    ///
    /// Returns the session that ends up bound to the intent; a second open
    /// keeps the first session so the buyer never sees two payment sheets.
    pub fn attach_session(
        &mut self,
        session: GatewaySession,
        now: DateTime<Utc>,
    ) -> Result<GatewaySession, PaymentError> {
        if self.status.is_terminal() {
            return Err(self.finalized_error());
        }
        if let Some(existing) = &self.session {
            return Ok(existing.clone());
        }
        self.transition(IntentStatus::GatewaySessionOpen, now)?;
        self.session = Some(session.clone());
        Ok(session)
    }

    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.transition(IntentStatus::Failed, now)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn finalized_error(&self) -> PaymentError {
        PaymentError::IntentAlreadyFinalized {
            intent_id: self.intent_id,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionId;

    fn intent() -> PurchaseIntent {
        PurchaseIntent::new(
            IntentId::generate(),
            BuyerId::new("buyer-1").unwrap(),
            "Chicken Product".to_string(),
            Amount::new(49900).unwrap(),
            Currency::inr(),
            Utc::now(),
        )
    }

    fn session_for(intent: &PurchaseIntent, id: &str) -> GatewaySession {
        GatewaySession {
            session_id: SessionId::new(id),
            intent_id: intent.intent_id,
            amount_minor_units: intent.amount_minor_units,
            currency: intent.currency.clone(),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut intent = intent();
        let now = Utc::now();
        intent.transition(IntentStatus::GatewaySessionOpen, now).unwrap();
        intent
            .transition(IntentStatus::AwaitingVerification, now)
            .unwrap();
        intent.transition(IntentStatus::Verified, now).unwrap();
        assert_eq!(intent.status, IntentStatus::Verified);
    }

    #[test]
    fn test_no_transition_out_of_terminal_states() {
        let targets = [
            IntentStatus::Created,
            IntentStatus::GatewaySessionOpen,
            IntentStatus::AwaitingVerification,
            IntentStatus::Verified,
            IntentStatus::Failed,
            IntentStatus::Cancelled,
        ];
        for terminal in [
            IntentStatus::Verified,
            IntentStatus::Failed,
            IntentStatus::Cancelled,
        ] {
            for next in targets {
                let mut intent = intent();
                intent.status = terminal;
                assert!(
                    matches!(
                        intent.transition(next, Utc::now()),
                        Err(PaymentError::IntentAlreadyFinalized { .. })
                    ),
                    "{terminal} -> {next} must be refused"
                );
                assert_eq!(intent.status, terminal);
            }
        }
    }

    #[test]
    fn test_undefined_edge_is_invalid_transition() {
        let mut intent = intent();
        let result = intent.transition(IntentStatus::Verified, Utc::now());
        assert!(matches!(
            result,
            Err(PaymentError::InvalidTransition {
                from: IntentStatus::Created,
                to: IntentStatus::Verified
            })
        ));
    }

    #[test]
    fn test_attach_session_keeps_first_session() {
        let mut intent = intent();
        let first = session_for(&intent, "order_first");
        let second = session_for(&intent, "order_second");

        let bound = intent.attach_session(first.clone(), Utc::now()).unwrap();
        assert_eq!(bound, first);
        assert_eq!(intent.status, IntentStatus::GatewaySessionOpen);

        let bound_again = intent.attach_session(second, Utc::now()).unwrap();
        assert_eq!(bound_again, first);
    }

    #[test]
    fn test_fail_records_reason() {
        let mut intent = intent();
        intent
            .transition(IntentStatus::GatewaySessionOpen, Utc::now())
            .unwrap();
        intent.fail("card declined", Utc::now()).unwrap();
        assert_eq!(intent.status, IntentStatus::Failed);
        assert_eq!(intent.failure_reason.as_deref(), Some("card declined"));
    }

    #[test]
    fn test_intent_id_parse() {
        let id = IntentId::generate();
        assert_eq!(id.to_string().parse::<IntentId>().unwrap(), id);
        assert!("ORD#123".parse::<IntentId>().is_err());
    }
}
