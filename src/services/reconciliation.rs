//! Unknown-outcome reconciliation.
//!
//! When a submission times out, the transfer may still have validated.
//! This service is the only sanctioned way to decide what happened:
//! it cross-checks the local store and the account's ledger history for
//! the memo-embedded reference before any resubmission is allowed.

use std::sync::Arc;
use tracing::{info, warn};

use crate::ledger::LedgerGateway;
use crate::store::SettlementStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Neither the store nor the ledger knows the reference; resubmission
    /// with a fresh reference is safe.
    SafeToRetry,
    /// The reference is already recorded locally; nothing to do.
    AlreadyRecorded { tx_hash: String },
    /// The ledger validated a transfer carrying the reference but no local
    /// record exists. Must not be resubmitted; flag for manual
    /// reconciliation.
    TransferFoundUnrecorded { tx_hash: String },
}

pub struct ReconciliationService {
    ledger: Arc<dyn LedgerGateway>,
    store: Arc<dyn SettlementStore>,
}

impl ReconciliationService {
    pub fn new(ledger: Arc<dyn LedgerGateway>, store: Arc<dyn SettlementStore>) -> Self {
        Self { ledger, store }
    }

    /// Resolves the true outcome of a submission by its UETR. `account`
    /// is the operator's address whose history carries the memo.
    pub async fn check_reference(
        &self,
        account: &str,
        uetr: &str,
    ) -> anyhow::Result<ReconciliationOutcome> {
        if let Some(settlement) = self.store.find_by_uetr(uetr).await? {
            info!(%uetr, tx_hash = %settlement.ledger_tx_hash, "reference already recorded");
            return Ok(ReconciliationOutcome::AlreadyRecorded {
                tx_hash: settlement.ledger_tx_hash,
            });
        }

        let history = self.ledger.account_transactions(account).await?;
        for payment in history {
            let memo_matches = payment
                .memo
                .as_deref()
                .map(|memo| memo.contains(uetr))
                .unwrap_or(false);
            if payment.validated && memo_matches {
                warn!(
                    %uetr,
                    tx_hash = %payment.tx_hash,
                    "validated ledger transfer has no local record"
                );
                return Ok(ReconciliationOutcome::TransferFoundUnrecorded {
                    tx_hash: payment.tx_hash,
                });
            }
        }

        info!(%uetr, "no ledger effect found for reference; retry is safe");
        Ok(ReconciliationOutcome::SafeToRetry)
    }
}
