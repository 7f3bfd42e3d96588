//! Domain entities for the settlement pipeline.

mod delivery;
mod message;
mod settlement;

pub use delivery::{compute_total_mxn, Delivery};
pub use message::{IsoMessage, MessageKind};
pub use settlement::{LedgerEffect, PartyRef, Settlement, SettlementStatus, SIMULATED_PREFIX};
