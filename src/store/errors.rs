use uuid::Uuid;

use crate::domain::order::OrderError;

// ============================================================================
// Store Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    EventLog(#[from] anyhow::Error),
}

impl StoreError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Order(e) => e.kind(),
            StoreError::EventLog(_) => "event_log",
        }
    }
}

/// One item of a batch that did not go through.
#[derive(Debug)]
pub struct BatchFailure {
    pub id: Uuid,
    pub reason: StoreError,
}

/// Per-id outcome of a batch status change. A failed item never rolls back
/// the others.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}
