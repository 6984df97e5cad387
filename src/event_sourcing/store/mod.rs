// ============================================================================
// Event Log - Generic Event Persistence
// ============================================================================

mod event_log;

pub use event_log::EventLog;
