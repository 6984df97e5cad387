// ============================================================================
// Order Store - authoritative in-memory order collection
// ============================================================================

mod errors;
mod order_store;

pub use errors::{BatchFailure, BatchOutcome, StoreError};
pub use order_store::OrderStore;
