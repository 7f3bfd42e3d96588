pub mod coordinator;
pub mod reconciliation;

pub use coordinator::{
    CoordinatorError, SettlementCoordinator, SettlementOutcome, SettlementRequest,
};
pub use reconciliation::{ReconciliationOutcome, ReconciliationService};
