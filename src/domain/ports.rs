use super::intent::{BuyerId, IntentId, PurchaseIntent};
use super::order::{Location, Order};
use super::session::{GatewaySession, SessionId, SessionRequest, VerificationClaim};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A change applied to a stored intent while the store holds its write guard.
///
/// If the mutation fails, the stored intent is left untouched.
pub type IntentMutation = Box<dyn FnOnce(&mut PurchaseIntent) -> Result<()> + Send>;

#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Inserts the intent unless one with the same id exists; returns the stored intent.
    async fn insert(&self, intent: PurchaseIntent) -> Result<PurchaseIntent>;
    async fn get(&self, intent_id: &IntentId) -> Result<Option<PurchaseIntent>>;
    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<PurchaseIntent>>;
    /// Applies `mutation` as a single compare-and-set step.
    async fn update(&self, intent_id: &IntentId, mutation: IntentMutation)
    -> Result<PurchaseIntent>;
    /// Intents with an open session (no verdict yet) opened before `cutoff`.
    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseIntent>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order and moves its intent to `Verified` in one atomic step.
    ///
    /// Fails with `PersistenceConflict` if an order already exists for the intent.
    async fn insert_verified(&self, order: Order) -> Result<()>;
    async fn get_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>>;
    /// The buyer's orders, newest first.
    async fn list_by_buyer(&self, buyer_id: &BuyerId) -> Result<Vec<Order>>;
    async fn attach_location(&self, buyer_id: &BuyerId, location: Location)
    -> Result<Option<Order>>;
}

/// Server-facing side of the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn open_session(&self, request: &SessionRequest) -> Result<SessionId>;
}

/// What the payment sheet reports once the buyer is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Paid(VerificationClaim),
    Dismissed,
    Failed { description: String },
}

/// Client-facing side of the gateway: the one-shot payment UI.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    async fn await_callback(&self, session: &GatewaySession) -> Result<GatewayEvent>;
}

pub type IntentStoreBox = Arc<dyn IntentStore>;
pub type OrderStoreBox = Arc<dyn OrderStore>;
pub type PaymentGatewayBox = Arc<dyn PaymentGateway>;
pub type PaymentSheetBox = Arc<dyn PaymentSheet>;
