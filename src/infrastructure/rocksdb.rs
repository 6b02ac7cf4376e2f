use crate::domain::intent::{BuyerId, IntentId, IntentStatus, PurchaseIntent};
use crate::domain::order::{Location, Order, OrderId, PaymentStatus};
use crate::domain::ports::{IntentMutation, IntentStore, OrderStore};
use crate::domain::session::SessionId;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for purchase intents, keyed by intent id.
pub const CF_INTENTS: &str = "intents";
/// Column Family mapping gateway session ids to intent ids.
pub const CF_SESSIONS: &str = "sessions";
/// Column Family for orders, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family enforcing one order per intent (intent id -> order id).
pub const CF_ORDER_INDEX: &str = "order_index";
/// Column Family listing each buyer's orders by creation time.
///
/// Keys are `len(buyer) | buyer | created_at micros | order id`, so a
/// buyer's orders form one contiguous, time-ordered range.
pub const CF_BUYER_ORDERS: &str = "buyer_orders";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_INTENTS,
    CF_SESSIONS,
    CF_ORDERS,
    CF_ORDER_INDEX,
    CF_BUYER_ORDERS,
];

fn buyer_prefix(buyer_id: &BuyerId) -> Vec<u8> {
    let buyer = buyer_id.as_str().as_bytes();
    let mut key = Vec::with_capacity(4 + buyer.len() + 8 + 40);
    key.extend_from_slice(&(buyer.len() as u32).to_be_bytes());
    key.extend_from_slice(buyer);
    key
}

fn buyer_order_key(order: &Order) -> Vec<u8> {
    let mut key = buyer_prefix(&order.buyer_id);
    // Sign bit flipped so big-endian bytes sort like the signed value.
    let micros = (order.created_at.timestamp_micros() as u64) ^ (1 << 63);
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(order.order_id.as_str().as_bytes());
    key
}

/// A persistent ledger using RocksDB.
///
/// Intents, the session index, orders, the unique intent index and the
/// per-buyer order index live in separate Column Families. Every read-modify-write goes through `write_lock`
/// and lands in a single `WriteBatch`, which makes the intent-id
/// compare-and-insert atomic.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::StorageError(format!("Column family {} not found", name))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn put<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn put_intent(&self, batch: &mut WriteBatch, intent: &PurchaseIntent) -> Result<()> {
        self.put(batch, CF_INTENTS, intent.intent_id.as_uuid().as_bytes(), intent)?;
        if let Some(session) = &intent.session {
            self.put(
                batch,
                CF_SESSIONS,
                session.session_id.as_str().as_bytes(),
                &intent.intent_id,
            )?;
        }
        Ok(())
    }

    fn get_intent(&self, intent_id: &IntentId) -> Result<Option<PurchaseIntent>> {
        self.read(CF_INTENTS, intent_id.as_uuid().as_bytes())
    }

    /// Walks only `buyer_id`'s range of the buyer index, newest first.
    fn buyer_order_ids(&self, buyer_id: &BuyerId) -> Result<Vec<OrderId>> {
        let cf = self.cf(CF_BUYER_ORDERS)?;
        let prefix = buyer_prefix(buyer_id);
        let mut order_ids = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_slice(), Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            order_ids.push(serde_json::from_slice(&value)?);
        }
        order_ids.reverse();
        Ok(order_ids)
    }

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.read(CF_ORDERS, order_id.as_str().as_bytes())
    }

    fn orders_newest_first(&self, buyer_id: &BuyerId) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for order_id in self.buyer_order_ids(buyer_id)? {
            if let Some(order) = self.get_order(&order_id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

#[async_trait]
impl IntentStore for RocksDBStore {
    async fn insert(&self, intent: PurchaseIntent) -> Result<PurchaseIntent> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.get_intent(&intent.intent_id)? {
            return Ok(existing);
        }
        let mut batch = WriteBatch::default();
        self.put_intent(&mut batch, &intent)?;
        self.db.write(batch)?;
        Ok(intent)
    }

    async fn get(&self, intent_id: &IntentId) -> Result<Option<PurchaseIntent>> {
        self.get_intent(intent_id)
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<PurchaseIntent>> {
        match self.read::<IntentId>(CF_SESSIONS, session_id.as_str().as_bytes())? {
            Some(intent_id) => self.get_intent(&intent_id),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        intent_id: &IntentId,
        mutation: IntentMutation,
    ) -> Result<PurchaseIntent> {
        let _guard = self.write_lock.lock().await;
        let mut intent = self
            .get_intent(intent_id)?
            .ok_or(PaymentError::IntentNotFound(*intent_id))?;

        mutation(&mut intent)?;

        let mut batch = WriteBatch::default();
        self.put_intent(&mut batch, &intent)?;
        self.db.write(batch)?;
        Ok(intent)
    }

    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseIntent>> {
        Ok(self
            .scan::<PurchaseIntent>(CF_INTENTS)?
            .into_iter()
            .filter(|intent| {
                matches!(
                    intent.status,
                    IntentStatus::GatewaySessionOpen | IntentStatus::AwaitingVerification
                ) && intent
                    .session
                    .as_ref()
                    .is_some_and(|session| session.opened_at < cutoff)
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert_verified(&self, order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let index_key = order.intent_id.as_uuid().as_bytes().to_vec();

        let index_cf = self.cf(CF_ORDER_INDEX)?;
        if self.db.get_pinned_cf(index_cf, &index_key)?.is_some() {
            return Err(PaymentError::PersistenceConflict(order.intent_id));
        }

        let mut intent = self
            .get_intent(&order.intent_id)?
            .ok_or(PaymentError::IntentNotFound(order.intent_id))?;
        intent.transition(IntentStatus::Verified, order.created_at)?;

        let mut batch = WriteBatch::default();
        self.put_intent(&mut batch, &intent)?;
        self.put(&mut batch, CF_ORDER_INDEX, &index_key, &order.order_id)?;
        self.put(&mut batch, CF_BUYER_ORDERS, &buyer_order_key(&order), &order.order_id)?;
        self.put(&mut batch, CF_ORDERS, order.order_id.as_str().as_bytes(), &order)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>> {
        let order_id: Option<OrderId> =
            self.read(CF_ORDER_INDEX, intent_id.as_uuid().as_bytes())?;
        match order_id {
            Some(order_id) => self.get_order(&order_id),
            None => Ok(None),
        }
    }

    async fn list_by_buyer(&self, buyer_id: &BuyerId) -> Result<Vec<Order>> {
        self.orders_newest_first(buyer_id)
    }

    async fn attach_location(
        &self,
        buyer_id: &BuyerId,
        location: Location,
    ) -> Result<Option<Order>> {
        let _guard = self.write_lock.lock().await;
        let mut latest = None;
        for order_id in self.buyer_order_ids(buyer_id)? {
            match self.get_order(&order_id)? {
                Some(order) if order.payment_status == PaymentStatus::Completed => {
                    latest = Some(order);
                    break;
                }
                _ => {}
            }
        }

        let Some(mut order) = latest else {
            return Ok(None);
        };
        order.set_location(location, Utc::now());

        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_ORDERS, order.order_id.as_str().as_bytes(), &order)?;
        self.db.write(batch)?;
        Ok(Some(order))
    }
}
