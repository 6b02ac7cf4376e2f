use super::intent::{BuyerId, IntentId, PurchaseIntent};
use super::money::{Amount, Currency};
use super::session::GatewayPaymentId;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Server-generated order id, stable for the lifetime of the order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn generate() -> Self {
        Self(format!("ord_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Completed,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Completed => f.write_str("Completed"),
            PaymentStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// Last known delivery position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PaymentError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(PaymentError::ValidationError(format!(
                "Coordinates out of range: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// The durable record of a verified payment.
///
/// At most one order exists per `intent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub intent_id: IntentId,
    pub buyer_id: BuyerId,
    pub items: Vec<String>,
    pub amount_minor_units: Amount,
    pub currency: Currency,
    pub payment_status: PaymentStatus,
    pub gateway_payment_id: GatewayPaymentId,
    #[serde(default)]
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds the completed order for a verified intent.
    pub fn completed(
        intent: &PurchaseIntent,
        gateway_payment_id: GatewayPaymentId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: OrderId::generate(),
            intent_id: intent.intent_id,
            buyer_id: intent.buyer_id.clone(),
            items: vec![intent.item_descriptor.clone()],
            amount_minor_units: intent.amount_minor_units,
            currency: intent.currency.clone(),
            payment_status: PaymentStatus::Completed,
            gateway_payment_id,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_location(&mut self, location: Location, now: DateTime<Utc>) {
        self.location = Some(location);
        self.updated_at = now;
    }
}
