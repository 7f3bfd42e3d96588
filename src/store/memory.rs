//! In-memory settlement store for tests and local experiments.
//!
//! Enforces the same unique constraints as the Postgres schema and is
//! naturally all-or-nothing: uniqueness is checked before any row is
//! inserted.

use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

use super::{RecordedSettlement, SettlementStore, StoreError};
use crate::domain::{Delivery, IsoMessage, Settlement};

#[derive(Default)]
struct Inner {
    settlements: Vec<Settlement>,
    deliveries: Vec<Delivery>,
    messages: Vec<IsoMessage>,
}

#[derive(Default)]
pub struct MemorySettlementStore {
    inner: Mutex<Inner>,
}

impl MemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settlement_count(&self) -> usize {
        self.inner.lock().unwrap().settlements.len()
    }

    pub fn delivery_count(&self) -> usize {
        self.inner.lock().unwrap().deliveries.len()
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }
}

#[async_trait]
impl SettlementStore for MemorySettlementStore {
    async fn record_settlement(
        &self,
        settlement: &Settlement,
        delivery: &Delivery,
        messages: &[IsoMessage],
    ) -> Result<RecordedSettlement, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let duplicate = inner.settlements.iter().any(|s| {
            s.uetr == settlement.uetr || s.ledger_tx_hash == settlement.ledger_tx_hash
        });
        if duplicate {
            return Err(StoreError::DuplicateReference(settlement.uetr.clone()));
        }

        inner.settlements.push(settlement.clone());
        inner.deliveries.push(delivery.clone());
        inner.messages.extend(messages.iter().cloned());

        Ok(RecordedSettlement {
            settlement_id: settlement.id,
            delivery_id: delivery.id,
            message_ids: messages.iter().map(|m| m.id).collect(),
        })
    }

    async fn get_settlement(&self, id: Uuid) -> Result<Settlement, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .settlements
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_by_uetr(&self, uetr: &str) -> Result<Option<Settlement>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .settlements
            .iter()
            .find(|s| s.uetr == uetr)
            .cloned())
    }

    async fn list_settlements(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Settlement>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut all = inner.settlements.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn delivery_for(&self, settlement_id: Uuid) -> Result<Delivery, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .deliveries
            .iter()
            .find(|d| d.settlement_id == settlement_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(settlement_id.to_string()))
    }

    async fn messages_for(&self, settlement_id: Uuid) -> Result<Vec<IsoMessage>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.settlement_id == settlement_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LedgerEffect, MessageKind, PartyRef};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn sample(uetr: &str, tx_hash: &str) -> (Settlement, Delivery, Vec<IsoMessage>) {
        let debtor = PartyRef {
            name: "Operator".to_string(),
            address: "rDebtorAddr11111111111111111111".to_string(),
        };
        let creditor = PartyRef {
            name: "Producer".to_string(),
            address: "rCreditorAddr111111111111111111".to_string(),
        };
        let settlement = Settlement::record(
            uetr.to_string(),
            format!("E2E{}", uetr),
            LedgerEffect::Validated {
                tx_hash: tx_hash.to_string(),
            },
            Decimal::from_str("25.000000").unwrap(),
            "XRP".to_string(),
            Decimal::from_str("500.00").unwrap(),
            &debtor,
            &creditor,
            None,
        );
        let delivery = Delivery::new(
            settlement.id,
            Decimal::from_str("10.0").unwrap(),
            Decimal::from_str("50.0").unwrap(),
            None,
        );
        let message = IsoMessage::new(
            settlement.id,
            MessageKind::Pacs008,
            "<Document/>".to_string(),
        );
        (settlement, delivery, vec![message])
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let store = MemorySettlementStore::new();
        let (settlement, delivery, messages) = sample("uetr-1", "HASH1");

        let recorded = store
            .record_settlement(&settlement, &delivery, &messages)
            .await
            .unwrap();
        assert_eq!(recorded.message_ids.len(), 1);

        let fetched = store.get_settlement(settlement.id).await.unwrap();
        assert_eq!(fetched.uetr, "uetr-1");
        assert_eq!(store.delivery_count(), 1);
        assert_eq!(
            store.messages_for(settlement.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_uetr_rejected_without_partial_rows() {
        let store = MemorySettlementStore::new();
        let (first, delivery, messages) = sample("uetr-dup", "HASH1");
        store
            .record_settlement(&first, &delivery, &messages)
            .await
            .unwrap();

        let (second, delivery2, messages2) = sample("uetr-dup", "HASH2");
        let err = store
            .record_settlement(&second, &delivery2, &messages2)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateReference(_)));
        assert_eq!(store.settlement_count(), 1);
        assert_eq!(store.delivery_count(), 1);
        assert_eq!(store.message_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_tx_hash_rejected() {
        let store = MemorySettlementStore::new();
        let (first, delivery, messages) = sample("uetr-a", "SAMEHASH");
        store
            .record_settlement(&first, &delivery, &messages)
            .await
            .unwrap();

        let (second, delivery2, messages2) = sample("uetr-b", "SAMEHASH");
        let err = store
            .record_settlement(&second, &delivery2, &messages2)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateReference(_)));
    }
}
