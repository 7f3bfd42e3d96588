//! Settlement entity: one producer payment linking business data to a
//! ledger effect.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Prefix marking synthetic transaction ids for currencies with no real
/// ledger movement.
pub const SIMULATED_PREFIX: &str = "SIMULATED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "settlement_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Completed,
    Failed,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A named XRPL account taking part in a settlement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PartyRef {
    pub name: String,
    pub address: String,
}

/// Outcome of the ledger step, as handed to the settlement constructor.
///
/// `Validated` carries a hash the ledger actually confirmed; `Simulated`
/// carries a synthetic id for non-native currencies. A settlement can only
/// be built from one of the two, so an unvalidated real hash is
/// unrepresentable in a persisted record.
#[derive(Debug, Clone)]
pub enum LedgerEffect {
    Validated { tx_hash: String },
    Simulated { tx_hash: String },
}

impl LedgerEffect {
    /// Builds the synthetic effect for a currency the ledger does not move:
    /// `SIMULATED-{currency}-{YYYYMMDDHHMMSS}-{4 hex chars}`.
    pub fn simulated(currency: &str) -> Self {
        let mut bytes = [0u8; 2];
        rand::thread_rng().fill_bytes(&mut bytes);
        let tx_hash = format!(
            "{}-{}-{}-{}",
            SIMULATED_PREFIX,
            currency,
            Utc::now().format("%Y%m%d%H%M%S"),
            hex::encode_upper(bytes)
        );
        Self::Simulated { tx_hash }
    }

    pub fn tx_hash(&self) -> &str {
        match self {
            Self::Validated { tx_hash } | Self::Simulated { tx_hash } => tx_hash,
        }
    }
}

/// The payment record. `uetr` and `ledger_tx_hash` are enforced-unique in
/// the store; `status` is `completed` for validated native transfers and
/// `pending` for simulated ones.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Settlement {
    pub id: Uuid,
    pub uetr: String,
    pub end_to_end_id: String,
    pub ledger_tx_hash: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    #[schema(value_type = Option<String>)]
    pub amount_mxn: Option<Decimal>,
    pub debtor_name: String,
    pub debtor_address: String,
    pub creditor_name: String,
    pub creditor_address: String,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Settlement {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        uetr: String,
        end_to_end_id: String,
        effect: LedgerEffect,
        amount: Decimal,
        currency: String,
        amount_mxn: Decimal,
        debtor: &PartyRef,
        creditor: &PartyRef,
        notes: Option<String>,
    ) -> Self {
        let (ledger_tx_hash, status) = match effect {
            LedgerEffect::Validated { tx_hash } => (tx_hash, SettlementStatus::Completed),
            LedgerEffect::Simulated { tx_hash } => (tx_hash, SettlementStatus::Pending),
        };
        Self {
            id: Uuid::new_v4(),
            uetr,
            end_to_end_id,
            ledger_tx_hash,
            amount,
            currency,
            amount_mxn: Some(amount_mxn),
            debtor_name: debtor.name.clone(),
            debtor_address: debtor.address.clone(),
            creditor_name: creditor.name.clone(),
            creditor_address: creditor.address.clone(),
            status,
            created_at: Utc::now(),
            notes,
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.ledger_tx_hash.starts_with(SIMULATED_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn parties() -> (PartyRef, PartyRef) {
        (
            PartyRef {
                name: "Operator".to_string(),
                address: "rOperatorAddress111111111111111".to_string(),
            },
            PartyRef {
                name: "Finca El Mirador".to_string(),
                address: "rProducerAddress111111111111111".to_string(),
            },
        )
    }

    #[test]
    fn test_validated_effect_yields_completed() {
        let (debtor, creditor) = parties();
        let settlement = Settlement::record(
            "uetr-1".to_string(),
            "E2E1".to_string(),
            LedgerEffect::Validated {
                tx_hash: "ABC123".to_string(),
            },
            Decimal::from_str("25.000000").unwrap(),
            "XRP".to_string(),
            Decimal::from_str("500.00").unwrap(),
            &debtor,
            &creditor,
            None,
        );
        assert_eq!(settlement.status, SettlementStatus::Completed);
        assert_eq!(settlement.ledger_tx_hash, "ABC123");
        assert!(!settlement.is_simulated());
    }

    #[test]
    fn test_simulated_effect_yields_pending() {
        let (debtor, creditor) = parties();
        let effect = LedgerEffect::simulated("USDC");
        let settlement = Settlement::record(
            "uetr-2".to_string(),
            "E2E2".to_string(),
            effect,
            Decimal::from_str("28.571429").unwrap(),
            "USDC".to_string(),
            Decimal::from_str("500.00").unwrap(),
            &debtor,
            &creditor,
            Some("lot 42".to_string()),
        );
        assert_eq!(settlement.status, SettlementStatus::Pending);
        assert!(settlement.ledger_tx_hash.starts_with("SIMULATED-USDC-"));
        assert!(settlement.is_simulated());
    }

    #[test]
    fn test_simulated_ids_distinct() {
        let a = LedgerEffect::simulated("USDC");
        let b = LedgerEffect::simulated("USDC");
        assert_ne!(a.tx_hash(), b.tx_hash());
    }
}
