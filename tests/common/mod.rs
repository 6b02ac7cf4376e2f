#![allow(dead_code)]

use payrecon::application::intents::IntentRequest;
use payrecon::config::{GatewaySecret, PayreconConfig};
use payrecon::domain::intent::BuyerId;
use payrecon::infrastructure::in_memory::InMemoryStore;
use payrecon::infrastructure::simulated_gateway::SimulatedGateway;
use payrecon::infrastructure::storage::Stores;
use payrecon::server::Services;
use std::sync::Arc;

pub const SECRET: &str = "merchant-secret";

pub fn test_config() -> PayreconConfig {
    let mut config = PayreconConfig::default();
    config.gateway.secret = GatewaySecret::new(SECRET);
    config.gateway.backoff_base_ms = 1;
    config
}

/// Fully wired services over a shared in-memory ledger and simulated gateway.
pub struct Harness {
    pub services: Services,
    pub gateway: Arc<SimulatedGateway>,
    pub store: InMemoryStore,
}

pub fn harness() -> Harness {
    let store = InMemoryStore::new();
    let stores = Stores {
        intents: Arc::new(store.clone()),
        orders: Arc::new(store.clone()),
    };
    let gateway = Arc::new(SimulatedGateway::new(GatewaySecret::new(SECRET)));
    let services = Services::build(&test_config(), stores, gateway.clone());
    Harness {
        services,
        gateway,
        store,
    }
}

pub fn buyer(id: &str) -> BuyerId {
    BuyerId::new(id).unwrap()
}

pub fn purchase(buyer: &str, amount_minor_units: i64) -> IntentRequest {
    IntentRequest {
        intent_id: None,
        buyer_id: self::buyer(buyer),
        item_descriptor: "Chicken Product".to_string(),
        amount_minor_units,
        currency: "INR".to_string(),
    }
}

/// Flips one byte of a hex signature while keeping it ASCII.
pub fn flip_byte(signature: &str, index: usize, mask: u8) -> String {
    let mut bytes = signature.as_bytes().to_vec();
    bytes[index] ^= mask;
    String::from_utf8(bytes).unwrap()
}
