use crate::domain::intent::{BuyerId, IntentId, IntentStatus, PurchaseIntent};
use crate::domain::order::{Location, Order, OrderId, PaymentStatus};
use crate::domain::ports::{IntentMutation, IntentStore, OrderStore};
use crate::domain::session::SessionId;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    intents: HashMap<IntentId, PurchaseIntent>,
    sessions: HashMap<SessionId, IntentId>,
    orders: HashMap<OrderId, Order>,
    orders_by_intent: HashMap<IntentId, OrderId>,
    /// Each buyer's orders in commit order, oldest first.
    orders_by_buyer: HashMap<BuyerId, Vec<OrderId>>,
}

/// A thread-safe in-memory ledger holding intents and orders together.
///
/// Both [`IntentStore`] and [`OrderStore`] are implemented on the same shared
/// state, so committing an order and verifying its intent happen under one
/// write guard. `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of order rows, for assertions in tests and diagnostics.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl IntentStore for InMemoryStore {
    async fn insert(&self, intent: PurchaseIntent) -> Result<PurchaseIntent> {
        let mut state = self.state.write().await;
        let stored = state
            .intents
            .entry(intent.intent_id)
            .or_insert(intent)
            .clone();
        Ok(stored)
    }

    async fn get(&self, intent_id: &IntentId) -> Result<Option<PurchaseIntent>> {
        let state = self.state.read().await;
        Ok(state.intents.get(intent_id).cloned())
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<PurchaseIntent>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .get(session_id)
            .and_then(|intent_id| state.intents.get(intent_id))
            .cloned())
    }

    async fn update(
        &self,
        intent_id: &IntentId,
        mutation: IntentMutation,
    ) -> Result<PurchaseIntent> {
        let mut state = self.state.write().await;
        let mut intent = state
            .intents
            .get(intent_id)
            .cloned()
            .ok_or(PaymentError::IntentNotFound(*intent_id))?;

        mutation(&mut intent)?;

        if let Some(session) = &intent.session {
            state
                .sessions
                .insert(session.session_id.clone(), intent.intent_id);
        }
        state.intents.insert(intent.intent_id, intent.clone());
        Ok(intent)
    }

    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseIntent>> {
        let state = self.state.read().await;
        Ok(state
            .intents
            .values()
            .filter(|intent| {
                matches!(
                    intent.status,
                    IntentStatus::GatewaySessionOpen | IntentStatus::AwaitingVerification
                ) && intent
                    .session
                    .as_ref()
                    .is_some_and(|session| session.opened_at < cutoff)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_verified(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().await;
        if state.orders_by_intent.contains_key(&order.intent_id) {
            return Err(PaymentError::PersistenceConflict(order.intent_id));
        }

        let mut intent = state
            .intents
            .get(&order.intent_id)
            .cloned()
            .ok_or(PaymentError::IntentNotFound(order.intent_id))?;
        intent.transition(IntentStatus::Verified, order.created_at)?;

        state.intents.insert(intent.intent_id, intent);
        state
            .orders_by_intent
            .insert(order.intent_id, order.order_id.clone());
        state
            .orders_by_buyer
            .entry(order.buyer_id.clone())
            .or_default()
            .push(order.order_id.clone());
        state.orders.insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn get_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders_by_intent
            .get(intent_id)
            .and_then(|order_id| state.orders.get(order_id))
            .cloned())
    }

    async fn list_by_buyer(&self, buyer_id: &BuyerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders_by_buyer
            .get(buyer_id)
            .into_iter()
            .flatten()
            .rev()
            .filter_map(|order_id| state.orders.get(order_id))
            .cloned()
            .collect())
    }

    async fn attach_location(
        &self,
        buyer_id: &BuyerId,
        location: Location,
    ) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        let latest = state
            .orders_by_buyer
            .get(buyer_id)
            .into_iter()
            .flatten()
            .rev()
            .find(|order_id| {
                state
                    .orders
                    .get(*order_id)
                    .is_some_and(|order| order.payment_status == PaymentStatus::Completed)
            })
            .cloned();

        Ok(latest.and_then(|order_id| {
            state.orders.get_mut(&order_id).map(|order| {
                order.set_location(location, Utc::now());
                order.clone()
            })
        }))
    }
}
