//! Order query handlers

use crate::domain::order::Order;
use crate::interfaces::http::auth::AuthenticatedBuyer;
use crate::interfaces::http::error::{ApiError, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub buyer_id: Option<String>,
}

/// The buyer's orders, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    caller: AuthenticatedBuyer,
    Query(query): Query<OrdersQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let buyer_id = caller.scope(query.buyer_id.as_deref())?;
    let orders = state.correlator.orders_for(&buyer_id).await?;
    Ok(Json(orders))
}

/// Delivery tracker poll: most recent completed order with its location.
pub async fn latest_order(
    State(state): State<AppState>,
    caller: AuthenticatedBuyer,
    Query(query): Query<OrdersQuery>,
) -> ApiResult<Json<Order>> {
    let buyer_id = caller.scope(query.buyer_id.as_deref())?;
    state
        .correlator
        .latest_order_with_location(&buyer_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No completed order for buyer {}", buyer_id)))
}
