use crate::domain::intent::BuyerId;
use crate::domain::order::{Order, PaymentStatus};
use crate::domain::ports::OrderStoreBox;
use crate::error::Result;

/// Read path for the delivery tracker, which polls it on a fixed interval.
///
/// Only committed orders are visible here; an intent still waiting for its
/// verdict has no order row and therefore never shows up.
pub struct LocationCorrelator {
    orders: OrderStoreBox,
}

impl LocationCorrelator {
    pub fn new(orders: OrderStoreBox) -> Self {
        Self { orders }
    }

    /// The buyer's most recent completed order, `None` if there is none yet.
    pub async fn latest_order_with_location(&self, buyer_id: &BuyerId) -> Result<Option<Order>> {
        Ok(self
            .orders
            .list_by_buyer(buyer_id)
            .await?
            .into_iter()
            .find(|order| order.payment_status == PaymentStatus::Completed))
    }

    /// All of the buyer's orders, newest first.
    pub async fn orders_for(&self, buyer_id: &BuyerId) -> Result<Vec<Order>> {
        self.orders.list_by_buyer(buyer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intent::{IntentId, IntentStatus, PurchaseIntent};
    use crate::domain::money::{Amount, Currency};
    use crate::domain::order::Location;
    use crate::domain::ports::{IntentStore, OrderStore};
    use crate::domain::session::{GatewayPaymentId, GatewaySession, SessionId};
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    async fn commit(store: &InMemoryStore, buyer: &str, item: &str) -> Order {
        let mut intent = PurchaseIntent::new(
            IntentId::generate(),
            BuyerId::new(buyer).unwrap(),
            item.to_string(),
            Amount::new(49900).unwrap(),
            Currency::inr(),
            Utc::now(),
        );
        let session = GatewaySession {
            session_id: SessionId::new(format!("order_{}", item)),
            intent_id: intent.intent_id,
            amount_minor_units: intent.amount_minor_units,
            currency: intent.currency.clone(),
            opened_at: Utc::now(),
        };
        intent.attach_session(session, Utc::now()).unwrap();
        intent
            .transition(IntentStatus::AwaitingVerification, Utc::now())
            .unwrap();
        let intent = store.insert(intent).await.unwrap();
        let order = Order::completed(&intent, GatewayPaymentId::new("pay"), Utc::now());
        store.insert_verified(order.clone()).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_new_buyer_has_no_order() {
        let correlator = LocationCorrelator::new(Arc::new(InMemoryStore::new()));
        let result = correlator
            .latest_order_with_location(&BuyerId::new("new-buyer").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_latest_order_and_location() {
        let store = InMemoryStore::new();
        let correlator = LocationCorrelator::new(Arc::new(store.clone()));
        let buyer = BuyerId::new("buyer-1").unwrap();

        commit(&store, "buyer-1", "first").await;
        let latest = commit(&store, "buyer-1", "second").await;
        commit(&store, "buyer-2", "other").await;

        let found = correlator
            .latest_order_with_location(&buyer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.order_id, latest.order_id);
        assert!(found.location.is_none());

        store
            .attach_location(&buyer, Location::new(12.97, 77.59).unwrap())
            .await
            .unwrap();
        let found = correlator
            .latest_order_with_location(&buyer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.location, Some(Location::new(12.97, 77.59).unwrap()));
    }

    #[tokio::test]
    async fn test_pending_intent_is_invisible() {
        let store = InMemoryStore::new();
        let correlator = LocationCorrelator::new(Arc::new(store.clone()));
        let intent = PurchaseIntent::new(
            IntentId::generate(),
            BuyerId::new("buyer-1").unwrap(),
            "pending".to_string(),
            Amount::new(100).unwrap(),
            Currency::inr(),
            Utc::now(),
        );
        store.insert(intent.clone()).await.unwrap();

        assert!(
            correlator
                .latest_order_with_location(&intent.buyer_id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
