//! Purchase intent handlers

use crate::application::intents::IntentRequest;
use crate::domain::intent::{BuyerId, IntentId, PurchaseIntent};
use crate::domain::session::GatewaySession;
use crate::error::PaymentError;
use crate::interfaces::http::auth::AuthenticatedBuyer;
use crate::interfaces::http::error::ApiResult;
use crate::interfaces::http::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

/// Create intent request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Client-generated idempotency key
    #[serde(default)]
    pub intent_id: Option<IntentId>,
    pub item_descriptor: String,
    pub amount_minor_units: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

pub async fn create_intent(
    State(state): State<AppState>,
    AuthenticatedBuyer(buyer_id): AuthenticatedBuyer,
    Json(body): Json<CreateIntentRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseIntent>)> {
    let intent = state
        .builder
        .create_intent(IntentRequest {
            intent_id: body.intent_id,
            buyer_id,
            item_descriptor: body.item_descriptor,
            amount_minor_units: body.amount_minor_units,
            currency: body.currency,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

pub async fn get_intent(
    State(state): State<AppState>,
    AuthenticatedBuyer(buyer_id): AuthenticatedBuyer,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseIntent>> {
    let intent = load_owned(&state, &id, &buyer_id).await?;
    Ok(Json(intent))
}

pub async fn open_session(
    State(state): State<AppState>,
    AuthenticatedBuyer(buyer_id): AuthenticatedBuyer,
    Path(id): Path<String>,
) -> ApiResult<Json<GatewaySession>> {
    let intent = load_owned(&state, &id, &buyer_id).await?;
    let session = state.builder.open_gateway_session(&intent.intent_id).await?;
    Ok(Json(session))
}

/// The buyer dismissed the payment sheet.
pub async fn cancel_intent(
    State(state): State<AppState>,
    AuthenticatedBuyer(buyer_id): AuthenticatedBuyer,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseIntent>> {
    let intent = load_owned(&state, &id, &buyer_id).await?;
    let cancelled = state.ledger.mark_cancelled(&intent.intent_id).await?;
    Ok(Json(cancelled))
}

/// Fetches an intent, hiding intents of other buyers behind a 404.
async fn load_owned(state: &AppState, id: &str, buyer_id: &BuyerId) -> ApiResult<PurchaseIntent> {
    let intent_id: IntentId = id.parse()?;
    let intent = state
        .intents
        .get(&intent_id)
        .await?
        .filter(|intent| &intent.buyer_id == buyer_id)
        .ok_or(PaymentError::IntentNotFound(intent_id))?;
    Ok(intent)
}
