// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// - Value objects (OrderStatus, OrderLineItem, StatusHistoryEntry, ...)
// - Status transition policy (pure rules)
// - Events, commands and errors
// - Aggregate (Order)
//
// ============================================================================

pub mod value_objects;
pub mod policy;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use policy::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
