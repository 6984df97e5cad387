// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Domain aggregates and their rules, kept separate from the event log and
// the in-memory stores that drive them.
//
// ============================================================================

pub mod order;
