//! Adapters for the domain ports: storage backends and payment gateways.

pub mod http_gateway;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod simulated_gateway;
pub mod storage;
