mod common;

use common::flip_byte;
use payrecon::application::verifier::{SignatureVerifier, compute_signature};
use payrecon::config::GatewaySecret;
use payrecon::domain::session::{GatewayPaymentId, SessionId, Signature};
use payrecon::error::PaymentError;
use proptest::prelude::*;

proptest! {
    #[test]
    fn flipping_any_single_byte_invalidates(
        session in "order_[A-Za-z0-9]{14}",
        payment in "pay_[A-Za-z0-9]{14}",
        index in 0usize..64,
        mask in 1u8..128,
    ) {
        let verifier = SignatureVerifier::new(GatewaySecret::new(common::SECRET));
        let session = SessionId::new(session);
        let payment = GatewayPaymentId::new(payment);
        let genuine = verifier.sign(&session, &payment);

        let tampered = Signature::new(flip_byte(&genuine, index, mask));
        prop_assert!(matches!(
            verifier.check(&session, &payment, &tampered),
            Err(PaymentError::SignatureInvalid)
        ));
        prop_assert!(verifier.check(&session, &payment, &Signature::new(genuine)).is_ok());
    }

    #[test]
    fn signatures_from_other_secrets_are_rejected(
        secret in "[a-z0-9]{1,32}",
        session in "order_[a-z0-9]{8}",
        payment in "pay_[a-z0-9]{8}",
    ) {
        prop_assume!(secret != common::SECRET);
        let verifier = SignatureVerifier::new(GatewaySecret::new(common::SECRET));
        let session = SessionId::new(session);
        let payment = GatewayPaymentId::new(payment);

        let forged = Signature::new(compute_signature(secret.as_bytes(), &session, &payment));
        prop_assert!(verifier.check(&session, &payment, &forged).is_err());
    }
}
