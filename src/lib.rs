// ============================================================================
// Bakery Fulfillment - order lifecycle and baking queue engine
// ============================================================================
//
// - domain:         Order aggregate, status transition policy, events
// - event_sourcing: envelopes, aggregate trait, in-memory event log + outbox
// - store:          authoritative order collection with per-order locking
// - baking:         production queue and baking-complete cascade
// - admin:          capability checks and per-actor rate limiting
// - engine:         the facade tying the pieces together
//
// ============================================================================

pub mod admin;
pub mod baking;
pub mod config;
pub mod domain;
pub mod engine;
pub mod event_sourcing;
pub mod messaging;
pub mod metrics;
pub mod store;

pub use config::EngineConfig;
pub use domain::order::{Order, OrderError, OrderStatus, StatusTransitionPolicy};
pub use engine::{CommandOutcome, EngineError, FulfillmentCommand, OrderFulfillmentEngine};
