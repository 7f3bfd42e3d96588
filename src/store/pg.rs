//! Postgres-backed settlement store.
//!
//! Every `record_settlement` call opens its own transaction and releases
//! it on every exit path; no session state is shared between operations.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordedSettlement, SettlementStore, StoreError};
use crate::domain::{Delivery, IsoMessage, Settlement};

#[derive(Clone)]
pub struct PgSettlementStore {
    pool: PgPool,
}

impl PgSettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique(e: sqlx::Error, reference: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateReference(reference.to_string());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl SettlementStore for PgSettlementStore {
    async fn record_settlement(
        &self,
        settlement: &Settlement,
        delivery: &Delivery,
        messages: &[IsoMessage],
    ) -> Result<RecordedSettlement, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO settlements (
                id, uetr, end_to_end_id, ledger_tx_hash, amount, currency, amount_mxn,
                debtor_name, debtor_address, creditor_name, creditor_address,
                status, created_at, notes
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
            "#,
        )
        .bind(settlement.id)
        .bind(&settlement.uetr)
        .bind(&settlement.end_to_end_id)
        .bind(&settlement.ledger_tx_hash)
        .bind(settlement.amount)
        .bind(&settlement.currency)
        .bind(settlement.amount_mxn)
        .bind(&settlement.debtor_name)
        .bind(&settlement.debtor_address)
        .bind(&settlement.creditor_name)
        .bind(&settlement.creditor_address)
        .bind(settlement.status)
        .bind(settlement.created_at)
        .bind(&settlement.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, &settlement.uetr))?;

        sqlx::query(
            r#"
            INSERT INTO deliveries (
                id, settlement_id, weight_kg, price_per_kg, total_mxn, delivered_at, notes
            ) VALUES ($1,$2,$3,$4,$5,$6,$7)
            "#,
        )
        .bind(delivery.id)
        .bind(delivery.settlement_id)
        .bind(delivery.weight_kg)
        .bind(delivery.price_per_kg)
        .bind(delivery.total_mxn)
        .bind(delivery.delivered_at)
        .bind(&delivery.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, &settlement.uetr))?;

        let mut message_ids = Vec::with_capacity(messages.len());
        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO iso_messages (id, settlement_id, kind, xml_content, created_at)
                VALUES ($1,$2,$3,$4,$5)
                "#,
            )
            .bind(message.id)
            .bind(message.settlement_id)
            .bind(message.kind)
            .bind(&message.xml_content)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;
            message_ids.push(message.id);
        }

        tx.commit().await?;

        Ok(RecordedSettlement {
            settlement_id: settlement.id,
            delivery_id: delivery.id,
            message_ids,
        })
    }

    async fn get_settlement(&self, id: Uuid) -> Result<Settlement, StoreError> {
        sqlx::query_as::<_, Settlement>("SELECT * FROM settlements WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_by_uetr(&self, uetr: &str) -> Result<Option<Settlement>, StoreError> {
        Ok(
            sqlx::query_as::<_, Settlement>("SELECT * FROM settlements WHERE uetr = $1")
                .bind(uetr)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_settlements(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Settlement>, StoreError> {
        Ok(sqlx::query_as::<_, Settlement>(
            "SELECT * FROM settlements ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delivery_for(&self, settlement_id: Uuid) -> Result<Delivery, StoreError> {
        sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE settlement_id = $1")
            .bind(settlement_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(settlement_id.to_string()))
    }

    async fn messages_for(&self, settlement_id: Uuid) -> Result<Vec<IsoMessage>, StoreError> {
        Ok(sqlx::query_as::<_, IsoMessage>(
            "SELECT * FROM iso_messages WHERE settlement_id = $1 ORDER BY created_at, id",
        )
        .bind(settlement_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
