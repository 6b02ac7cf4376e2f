use super::intent::IntentId;
use super::money::{Amount, Currency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session id issued by the gateway (the gateway's "order id").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayPaymentId(String);

impl GatewayPaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GatewayPaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex-encoded HMAC-SHA256 signature as delivered by the gateway.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} chars)", self.0.len())
    }
}

/// Read-only copy of a gateway-side payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySession {
    pub session_id: SessionId,
    pub intent_id: IntentId,
    pub amount_minor_units: Amount,
    pub currency: Currency,
    pub opened_at: DateTime<Utc>,
}

/// Create-session request sent to the gateway; `receipt` carries the intent id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub amount: Amount,
    pub currency: Currency,
    pub receipt: IntentId,
}

/// A "payment succeeded" claim relayed from the gateway callback.
///
/// Consumed exactly once by the verifier; only its verdict is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationClaim {
    pub session_id: SessionId,
    pub gateway_payment_id: GatewayPaymentId,
    pub signature: Signature,
    #[serde(default = "Utc::now", skip_deserializing)]
    pub received_at: DateTime<Utc>,
}

impl VerificationClaim {
    pub fn new(session_id: SessionId, gateway_payment_id: GatewayPaymentId, signature: Signature) -> Self {
        Self {
            session_id,
            gateway_payment_id,
            signature,
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_deserializes_camel_case() {
        let body = r#"{"sessionId":"order_1","gatewayPaymentId":"pay_1","signature":"ab12"}"#;
        let claim: VerificationClaim = serde_json::from_str(body).unwrap();
        assert_eq!(claim.session_id, SessionId::new("order_1"));
        assert_eq!(claim.gateway_payment_id.as_str(), "pay_1");
        assert_eq!(claim.signature.as_str(), "ab12");
    }

    #[test]
    fn test_signature_debug_is_redacted() {
        let signature = Signature::new("deadbeef");
        assert_eq!(format!("{:?}", signature), "Signature(8 chars)");
    }
}
