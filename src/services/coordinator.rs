//! Settlement coordinator: the pipeline's state machine.
//!
//! One submission walks `Idle -> AmountComputed -> Submitted -> Recorded
//! -> Done`; `Failed` is reachable from `Submitted` and `Recorded`. Input
//! is rejected before any ledger traffic; rows are written only after the
//! ledger call returns, all inside one store transaction. The signing
//! secret is consumed by value and never stored or logged.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    Delivery, IsoMessage, LedgerEffect, MessageKind, PartyRef, Settlement, SettlementStatus,
};
use crate::ids::{self, E2E_PREFIX};
use crate::iso::{self, IsoError, PaymentFields};
use crate::ledger::{validate_address, LedgerError, LedgerGateway};
use crate::rates::RateTable;
use crate::secrets::SigningSecret;
use crate::store::{SettlementStore, StoreError};

/// The only currency the ledger actually moves; everything else is
/// policy-simulated.
pub const NATIVE_CURRENCY: &str = "XRP";

/// Default wall-clock budget for one ledger submission.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AmountComputed,
    Submitted,
    Recorded,
    Done,
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Rejected before any ledger call; fully recoverable by re-entering
    /// data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The ledger refused or never accepted the transfer; no local state
    /// exists and a retry with a fresh reference is safe.
    #[error(transparent)]
    Ledger(LedgerError),
    /// The transfer was submitted but its outcome is unknown. Nothing was
    /// persisted; the reference must be reconciled against the ledger
    /// before any resubmission.
    #[error("Outcome unknown for settlement {uetr}; reconcile against the ledger before retrying")]
    UnknownOutcome { uetr: String },
    /// The ledger transfer validated but the record could not be written.
    /// The ledger effect cannot be rolled back; manual reconciliation is
    /// required.
    #[error("Settlement {uetr} not recorded after validated transfer {ledger_tx_hash}; manual reconciliation required")]
    Integrity {
        uetr: String,
        ledger_tx_hash: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Store(StoreError),
    /// Missing settlement fields at generation time; a programming error
    /// for any settlement that reached this stage.
    #[error("Message generation failed: {0}")]
    Generation(#[from] IsoError),
}

/// Operator input for one settlement.
#[derive(Clone)]
pub struct SettlementRequest {
    pub weight_kg: Decimal,
    pub price_per_kg: Decimal,
    pub currency: String,
    pub operator: PartyRef,
    pub producer: Option<PartyRef>,
    pub notes: Option<String>,
}

/// Everything the caller needs after a recorded settlement.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub settlement: Settlement,
    pub delivery: Delivery,
    pub messages: Vec<IsoMessage>,
}

pub struct SettlementCoordinator {
    store: Arc<dyn SettlementStore>,
    ledger: Arc<dyn LedgerGateway>,
    rates: RateTable,
    submit_timeout: Duration,
}

impl SettlementCoordinator {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        ledger: Arc<dyn LedgerGateway>,
        rates: RateTable,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            rates,
            submit_timeout,
        }
    }

    /// Runs one settlement end to end. At most one call per operator
    /// session may be in flight; the caller serializes submissions.
    #[instrument(skip_all, fields(currency = %request.currency))]
    pub async fn submit_settlement(
        &self,
        request: SettlementRequest,
        secret: SigningSecret,
    ) -> Result<SettlementOutcome, CoordinatorError> {
        // Idle -> AmountComputed. Everything here fails before the ledger
        // is touched.
        let producer = request
            .producer
            .clone()
            .ok_or_else(|| CoordinatorError::InvalidInput("no producer selected".to_string()))?;
        if request.weight_kg <= Decimal::ZERO {
            return Err(CoordinatorError::InvalidInput(
                "weight must be greater than 0".to_string(),
            ));
        }
        if request.price_per_kg <= Decimal::ZERO {
            return Err(CoordinatorError::InvalidInput(
                "price per kg must be greater than 0".to_string(),
            ));
        }
        if !validate_address(&producer.address) {
            return Err(CoordinatorError::InvalidInput(format!(
                "malformed destination address: {}",
                producer.address
            )));
        }

        let total_mxn = crate::domain::compute_total_mxn(request.weight_kg, request.price_per_kg);
        let token_amount = self
            .rates
            .mxn_to_token(total_mxn, &request.currency)
            .map_err(|e| CoordinatorError::InvalidInput(e.to_string()))?;
        debug!(phase = ?Phase::AmountComputed, %total_mxn, %token_amount);

        // AmountComputed -> Submitted. Fresh identifiers per attempt; a
        // failed attempt is retried with a new reference, never reused.
        let uetr = ids::new_transaction_reference();
        let end_to_end_id = ids::new_end_to_end_id(E2E_PREFIX);
        let memo = format!("Coffee settlement {}", uetr);

        let effect = if request.currency == NATIVE_CURRENCY {
            match self
                .ledger
                .submit_transfer(
                    &secret,
                    &producer.address,
                    token_amount,
                    &memo,
                    self.submit_timeout,
                )
                .await
            {
                Ok(outcome) => {
                    debug!(phase = ?Phase::Submitted, tx_hash = %outcome.tx_hash,
                           result_code = %outcome.result_code);
                    LedgerEffect::Validated {
                        tx_hash: outcome.tx_hash,
                    }
                }
                Err(LedgerError::Timeout(elapsed)) => {
                    // The transfer may or may not have validated. Persist
                    // nothing; the operator checks the ledger by memo
                    // reference before any retry.
                    warn!(%uetr, ?elapsed, "submission outcome unknown");
                    return Err(CoordinatorError::UnknownOutcome { uetr });
                }
                Err(e) => return Err(CoordinatorError::Ledger(e)),
            }
        } else {
            // No real transfer for non-native currencies; a tagged
            // synthetic id keeps the record auditable.
            let effect = LedgerEffect::simulated(&request.currency);
            debug!(phase = ?Phase::Submitted, tx_hash = %effect.tx_hash(), simulated = true);
            effect
        };
        drop(secret); // zeroed here; the record step must not touch it

        // Submitted -> Recorded. One transaction for all three entities.
        let settlement = Settlement::record(
            uetr,
            end_to_end_id,
            effect,
            token_amount,
            request.currency.clone(),
            total_mxn,
            &request.operator,
            &producer,
            request.notes.clone(),
        );
        let delivery = Delivery::new(
            settlement.id,
            request.weight_kg,
            request.price_per_kg,
            request.notes,
        );

        let fields = PaymentFields::from_settlement(&settlement);
        let generated_at = Utc::now();
        let messages = vec![
            IsoMessage::new(
                settlement.id,
                MessageKind::Pacs008,
                iso::pacs008(&fields, generated_at)?,
            ),
            IsoMessage::new(
                settlement.id,
                MessageKind::Camt054,
                iso::camt054(&fields, generated_at)?,
            ),
        ];

        if let Err(e) = self
            .store
            .record_settlement(&settlement, &delivery, &messages)
            .await
        {
            if matches!(e, StoreError::DuplicateReference(_))
                && settlement.status == SettlementStatus::Completed
            {
                error!(
                    uetr = %settlement.uetr,
                    ledger_tx_hash = %settlement.ledger_tx_hash,
                    "validated ledger transfer has no local record; manual reconciliation required"
                );
                return Err(CoordinatorError::Integrity {
                    uetr: settlement.uetr,
                    ledger_tx_hash: settlement.ledger_tx_hash,
                    source: e,
                });
            }
            return Err(CoordinatorError::Store(e));
        }
        debug!(phase = ?Phase::Recorded, uetr = %settlement.uetr);

        // Recorded -> Done.
        info!(
            phase = ?Phase::Done,
            uetr = %settlement.uetr,
            tx_hash = %settlement.ledger_tx_hash,
            status = settlement.status.as_str(),
            "settlement recorded"
        );
        Ok(SettlementOutcome {
            settlement,
            delivery,
            messages,
        })
    }
}
