//! Verification endpoint
//!
//! The caller must own the intent behind the session; claims sent by
//! anyone else are rejected before the intent is touched.

use crate::application::verifier::Verdict;
use crate::domain::order::OrderId;
use crate::domain::session::VerificationClaim;
use crate::error::RejectionReason;
use crate::interfaces::http::auth::AuthenticatedBuyer;
use crate::interfaces::http::error::ApiResult;
use crate::interfaces::http::state::AppState;
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerifyResponse {
    Verified {
        #[serde(rename = "orderId")]
        order_id: OrderId,
    },
    Rejected {
        reason: RejectionReason,
    },
}

fn rejected(reason: RejectionReason) -> (StatusCode, Json<VerifyResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(VerifyResponse::Rejected { reason }),
    )
}

pub async fn verify_payment(
    State(state): State<AppState>,
    AuthenticatedBuyer(buyer_id): AuthenticatedBuyer,
    claim: Result<Json<VerificationClaim>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<VerifyResponse>)> {
    let Json(claim) = match claim {
        Ok(claim) => claim,
        Err(rejection) => {
            tracing::warn!(
                buyer_id = %buyer_id,
                error = %rejection.body_text(),
                "Malformed verification claim"
            );
            return Ok(rejected(RejectionReason::MalformedClaim));
        }
    };

    let response = match state.verifier.verify(&buyer_id, claim).await? {
        Verdict::Accepted(order) => (
            StatusCode::OK,
            Json(VerifyResponse::Verified {
                order_id: order.order_id,
            }),
        ),
        Verdict::Rejected(reason) => rejected(reason),
    };
    Ok(response)
}
