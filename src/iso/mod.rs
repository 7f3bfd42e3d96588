//! ISO 20022 message generation.
//!
//! Core-aligned subset of pacs.008 (credit transfer), camt.054
//! (debit/credit notification) and camt.053 (statement). Simplified,
//! not for production banking use.

mod generator;

pub use generator::{
    camt053, camt054, generate, pacs008, IsoError, PaymentFields, StatementEntry, StatementFields,
};
