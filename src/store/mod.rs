//! Durable settlement storage.
//!
//! `SettlementStore` is the contract the coordinator writes through:
//! `record_settlement` commits the settlement, its delivery and its
//! generated messages as one unit, or nothing at all. The Postgres
//! implementation backs the service; the in-memory one backs tests.

mod memory;
mod pg;

pub use memory::MemorySettlementStore;
pub use pg::PgSettlementStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Delivery, IsoMessage, Settlement};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The transaction reference or ledger tx hash already exists. Fatal:
    /// it indicates duplicate identifier generation or a double
    /// submission, never a transient condition.
    #[error("Duplicate reference: {0}")]
    DuplicateReference(String),
    #[error("Settlement not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Identifiers of the rows committed by `record_settlement`.
#[derive(Debug, Clone)]
pub struct RecordedSettlement {
    pub settlement_id: Uuid,
    pub delivery_id: Uuid,
    pub message_ids: Vec<Uuid>,
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Persists settlement + delivery + messages atomically. Either all
    /// rows are visible afterwards or none are.
    async fn record_settlement(
        &self,
        settlement: &Settlement,
        delivery: &Delivery,
        messages: &[IsoMessage],
    ) -> Result<RecordedSettlement, StoreError>;

    async fn get_settlement(&self, id: Uuid) -> Result<Settlement, StoreError>;

    async fn find_by_uetr(&self, uetr: &str) -> Result<Option<Settlement>, StoreError>;

    async fn list_settlements(&self, limit: i64, offset: i64)
        -> Result<Vec<Settlement>, StoreError>;

    async fn delivery_for(&self, settlement_id: Uuid) -> Result<Delivery, StoreError>;

    async fn messages_for(&self, settlement_id: Uuid) -> Result<Vec<IsoMessage>, StoreError>;
}
