//! XRP Ledger access.
//!
//! `XrplClient` wraps the JSON-RPC API (submission, confirmation polling,
//! balance and transaction queries). The `LedgerGateway` trait is the seam
//! the coordinator depends on, so orchestration logic is testable without
//! a network.

pub mod client;

pub use client::XrplClient;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use crate::secrets::SigningSecret;

/// Drops per XRP.
pub const DROPS_PER_XRP: u64 = 1_000_000;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid XRPL seed")]
    InvalidSecret,
    #[error("Invalid XRPL address: {0}")]
    InvalidAddress(String),
    #[error("Amount not representable in drops: {0}")]
    InvalidAmount(Decimal),
    #[error("Ledger unreachable: {0}")]
    LedgerUnreachable(String),
    #[error("Transfer rejected by the ledger: {0}")]
    TransferRejected(String),
    #[error("Submission outcome unknown after {0:?}")]
    Timeout(Duration),
    #[error("Transaction not found: {0}")]
    NotFound(String),
    #[error("Invalid response from ledger: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open - ledger RPC unavailable")]
    CircuitBreakerOpen,
}

/// Validated outcome of a submitted transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub tx_hash: String,
    pub validated: bool,
    pub result_code: String,
    pub ledger_index: Option<u64>,
}

/// Post-hoc confirmation of a transaction looked up by hash.
#[derive(Debug, Clone)]
pub struct TransactionProof {
    pub validated: bool,
    pub result_code: Option<String>,
    pub ledger_index: Option<u64>,
}

/// One entry from an account's transaction history, as consumed by
/// reconciliation.
#[derive(Debug, Clone)]
pub struct LedgerPayment {
    pub tx_hash: String,
    pub destination: Option<String>,
    pub memo: Option<String>,
    pub validated: bool,
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Deterministically derives the public address for a signing secret.
    fn derive_identity(&self, secret: &SigningSecret) -> Result<String, LedgerError>;

    /// Submits a transfer and blocks until the ledger validates or rejects
    /// it, or `timeout` elapses. Not idempotent: resubmission creates a new
    /// transfer, so a `Timeout` must be reconciled before any retry.
    async fn submit_transfer(
        &self,
        secret: &SigningSecret,
        destination: &str,
        amount_xrp: Decimal,
        memo: &str,
        timeout: Duration,
    ) -> Result<TransferOutcome, LedgerError>;

    /// Re-queries the ledger by hash for post-hoc confirmation.
    async fn verify_transaction(&self, tx_hash: &str) -> Result<TransactionProof, LedgerError>;

    /// Recent transactions touching `address`, newest first.
    async fn account_transactions(&self, address: &str)
        -> Result<Vec<LedgerPayment>, LedgerError>;
}

/// Structural address check only: `r` prefix, 25-35 alphanumeric chars.
/// Says nothing about the account existing or being funded.
pub fn validate_address(address: &str) -> bool {
    address.starts_with('r')
        && (25..=35).contains(&address.len())
        && address.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Structural seed check: `s` prefix, 20-40 alphanumeric chars.
pub fn validate_seed(seed: &str) -> bool {
    seed.starts_with('s')
        && (20..=40).contains(&seed.len())
        && seed.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Converts an XRP amount to drops; the amount must not carry more than
/// six decimal places.
pub fn xrp_to_drops(amount_xrp: Decimal) -> Result<u64, LedgerError> {
    let drops = amount_xrp * Decimal::from(DROPS_PER_XRP);
    if drops.fract() != Decimal::ZERO || drops.is_sign_negative() {
        return Err(LedgerError::InvalidAmount(amount_xrp));
    }
    drops
        .to_u64()
        .ok_or(LedgerError::InvalidAmount(amount_xrp))
}

pub fn drops_to_xrp(drops: u64) -> Decimal {
    Decimal::from(drops) / Decimal::from(DROPS_PER_XRP)
}
