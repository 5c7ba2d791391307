//! Generation state store.
//!
//! Persistent render job records with idempotent upsert and compare-and-set
//! status updates. This crate is the single writer of job lifecycle state;
//! see [`GenerationStore`] for the contract.

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryGenerationStore;
pub use redis_store::{RedisGenerationStore, StoreConfig};
pub use store::{GenerationStore, Upserted};
