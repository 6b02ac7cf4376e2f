use crate::domain::intent::{BuyerId, IntentId, IntentStatus, PurchaseIntent};
use crate::domain::order::{Location, Order};
use crate::domain::ports::{IntentStoreBox, OrderStoreBox};
use crate::domain::session::GatewayPaymentId;
use crate::error::{PaymentError, Result};
use chrono::Utc;

/// The single writer of orders and terminal intent states.
///
/// `commit_order` is idempotent on the intent id: a duplicate callback or a
/// retried request gets the order that already exists instead of an error.
pub struct OrderLedger {
    intents: IntentStoreBox,
    orders: OrderStoreBox,
}

impl OrderLedger {
    pub fn new(intents: IntentStoreBox, orders: OrderStoreBox) -> Self {
        Self { intents, orders }
    }

    /// Commits the order for a verified payment, or returns the existing one.
    pub async fn commit_order(
        &self,
        intent: &PurchaseIntent,
        gateway_payment_id: GatewayPaymentId,
    ) -> Result<Order> {
        let order = Order::completed(intent, gateway_payment_id, Utc::now());

        match self.orders.insert_verified(order.clone()).await {
            Ok(()) => {
                tracing::info!(
                    intent_id = %intent.intent_id,
                    order_id = %order.order_id,
                    buyer_id = %order.buyer_id,
                    amount = order.amount_minor_units.minor_units(),
                    "Order committed"
                );
                Ok(order)
            }
            Err(PaymentError::PersistenceConflict(intent_id)) => {
                let existing = self.orders.get_by_intent(&intent_id).await?.ok_or_else(|| {
                    PaymentError::StorageError(format!(
                        "order index for intent {} points nowhere",
                        intent_id
                    ))
                })?;
                tracing::debug!(
                    intent_id = %intent_id,
                    order_id = %existing.order_id,
                    "Duplicate commit resolved to existing order"
                );
                Ok(existing)
            }
            Err(err) => Err(err),
        }
    }

    /// Records a terminal failure; no order is created.
    pub async fn mark_failed(&self, intent_id: &IntentId, reason: &str) -> Result<PurchaseIntent> {
        let reason = reason.to_string();
        let logged_reason = reason.clone();
        let intent = self
            .intents
            .update(
                intent_id,
                Box::new(move |intent: &mut PurchaseIntent| intent.fail(reason, Utc::now())),
            )
            .await?;
        tracing::warn!(intent_id = %intent_id, reason = %logged_reason, "Purchase intent failed");
        Ok(intent)
    }

    /// Records that the buyer dismissed the payment sheet.
    pub async fn mark_cancelled(&self, intent_id: &IntentId) -> Result<PurchaseIntent> {
        let intent = self
            .intents
            .update(
                intent_id,
                Box::new(|intent: &mut PurchaseIntent| {
                    intent.transition(IntentStatus::Cancelled, Utc::now())
                }),
            )
            .await?;
        tracing::info!(intent_id = %intent_id, "Purchase intent cancelled by buyer");
        Ok(intent)
    }

    /// Write hook for the delivery tracker: pins `location` on the buyer's
    /// most recent completed order.
    pub async fn attach_location(&self, buyer_id: &BuyerId, location: Location) -> Result<Option<Order>> {
        let order = self.orders.attach_location(buyer_id, location).await?;
        if let Some(order) = &order {
            tracing::debug!(order_id = %order.order_id, "Delivery location updated");
        }
        Ok(order)
    }
}
