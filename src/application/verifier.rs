use super::ledger::OrderLedger;
use crate::config::GatewaySecret;
use crate::domain::intent::{BuyerId, IntentStatus, PurchaseIntent};
use crate::domain::order::Order;
use crate::domain::ports::IntentStoreBox;
use crate::domain::session::{GatewayPaymentId, SessionId, Signature, VerificationClaim};
use crate::error::{PaymentError, RejectionReason, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Computes the gateway signature: hex(HMAC-SHA256(secret, "{session_id}|{payment_id}")).
pub fn compute_signature(
    secret: &[u8],
    session_id: &SessionId,
    payment_id: &GatewayPaymentId,
) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(session_id.as_str().as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_str().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Pure signature check against the merchant secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: GatewaySecret,
}

impl SignatureVerifier {
    pub fn new(secret: GatewaySecret) -> Self {
        Self { secret }
    }

    pub fn sign(&self, session_id: &SessionId, payment_id: &GatewayPaymentId) -> String {
        compute_signature(self.secret.expose().as_bytes(), session_id, payment_id)
    }

    /// Compares the supplied signature with the expected one in constant time.
    ///
    /// The comparison runs over the hex text itself, so any altered character
    /// (including a change of letter case) is a mismatch.
    pub fn check(
        &self,
        session_id: &SessionId,
        payment_id: &GatewayPaymentId,
        signature: &Signature,
    ) -> Result<()> {
        let expected = self.sign(session_id, payment_id);
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Ok(())
        } else {
            Err(PaymentError::SignatureInvalid)
        }
    }
}

/// Outcome of consuming a verification claim.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(Order),
    Rejected(RejectionReason),
}

/// Consumes gateway claims: resolves the session, guards against replays,
/// checks the signature and hands accepted payments to the ledger.
///
/// A claim is only consumed on behalf of the buyer who owns the intent.
/// Claims from anyone else are refused as `SessionUnknown` before the
/// intent is touched.
pub struct ClaimVerifier {
    intents: IntentStoreBox,
    ledger: Arc<OrderLedger>,
    signatures: SignatureVerifier,
}

impl ClaimVerifier {
    pub fn new(intents: IntentStoreBox, ledger: Arc<OrderLedger>, signatures: SignatureVerifier) -> Self {
        Self {
            intents,
            ledger,
            signatures,
        }
    }

    pub async fn verify(&self, caller: &BuyerId, claim: VerificationClaim) -> Result<Verdict> {
        match self.consume(caller, &claim).await {
            Ok(order) => Ok(Verdict::Accepted(order)),
            Err(err) => match err.rejection() {
                Some(reason) => {
                    tracing::warn!(
                        session_id = %claim.session_id,
                        caller = %caller,
                        payment_id = %claim.gateway_payment_id,
                        ?reason,
                        "Verification claim rejected"
                    );
                    Ok(Verdict::Rejected(reason))
                }
                None => Err(err),
            },
        }
    }

    async fn consume(&self, caller: &BuyerId, claim: &VerificationClaim) -> Result<Order> {
        let intent = self
            .intents
            .find_by_session(&claim.session_id)
            .await?
            .filter(|intent| &intent.buyer_id == caller)
            .ok_or(PaymentError::SessionUnknown)?;

        let intent = self
            .intents
            .update(
                &intent.intent_id,
                Box::new(|intent: &mut PurchaseIntent| begin_verification(intent)),
            )
            .await?;

        if let Err(err) =
            self.signatures
                .check(&claim.session_id, &claim.gateway_payment_id, &claim.signature)
        {
            match self
                .ledger
                .mark_failed(&intent.intent_id, "signature invalid")
                .await
            {
                Ok(_) | Err(PaymentError::IntentAlreadyFinalized { .. }) => {}
                Err(storage_err) => return Err(storage_err),
            }
            return Err(err);
        }

        self.ledger
            .commit_order(&intent, claim.gateway_payment_id.clone())
            .await
    }
}

/// Records that the gateway callback arrived. A claim may only be consumed
/// once: verified or failed intents reject it as a replay.
fn begin_verification(intent: &mut PurchaseIntent) -> Result<()> {
    match intent.status {
        IntentStatus::Verified | IntentStatus::Failed => Err(PaymentError::ReplayedClaim),
        IntentStatus::AwaitingVerification => Ok(()),
        _ => intent.transition(IntentStatus::AwaitingVerification, Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(GatewaySecret::new("merchant-secret"))
    }

    #[test]
    fn test_known_vector() {
        // echo -n "order_abc|pay_xyz" | openssl dgst -sha256 -hmac "merchant-secret"
        let signature = compute_signature(
            b"merchant-secret",
            &SessionId::new("order_abc"),
            &GatewayPaymentId::new("pay_xyz"),
        );
        assert_eq!(
            signature,
            "e52937c2b087cd12ee73236079efbd6bc95fb2bbcbcae225ae76f74411ac8230"
        );
    }

    #[test]
    fn test_valid_signature_accepted() {
        let verifier = verifier();
        let session = SessionId::new("order_abc");
        let payment = GatewayPaymentId::new("pay_xyz");
        let signature = Signature::new(verifier.sign(&session, &payment));
        assert!(verifier.check(&session, &payment, &signature).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let session = SessionId::new("order_abc");
        let payment = GatewayPaymentId::new("pay_xyz");
        let forged = Signature::new(compute_signature(b"guessed", &session, &payment));
        assert!(matches!(
            verifier().check(&session, &payment, &forged),
            Err(PaymentError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_signature_bound_to_payment_id() {
        let verifier = verifier();
        let session = SessionId::new("order_abc");
        let signature = Signature::new(verifier.sign(&session, &GatewayPaymentId::new("pay_1")));
        assert!(
            verifier
                .check(&session, &GatewayPaymentId::new("pay_2"), &signature)
                .is_err()
        );
    }

    #[test]
    fn test_uppercase_hex_rejected() {
        let verifier = verifier();
        let session = SessionId::new("order_abc");
        let payment = GatewayPaymentId::new("pay_xyz");
        let upper = Signature::new(verifier.sign(&session, &payment).to_ascii_uppercase());
        assert!(verifier.check(&session, &payment, &upper).is_err());
    }

    #[test]
    fn test_truncated_and_empty_signatures_rejected() {
        let verifier = verifier();
        let session = SessionId::new("order_abc");
        let payment = GatewayPaymentId::new("pay_xyz");
        let full = verifier.sign(&session, &payment);
        assert!(
            verifier
                .check(&session, &payment, &Signature::new(&full[..63]))
                .is_err()
        );
        assert!(verifier.check(&session, &payment, &Signature::new("")).is_err());
    }
}
