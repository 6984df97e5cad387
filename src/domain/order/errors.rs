use std::fmt;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

/// Which way along the happy path a step was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("next"),
            Direction::Backward => f.write_str("previous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Advance/revert with no step left in that direction.
    #[error("Order in status {status} has no {direction} status")]
    TerminalState { status: OrderStatus, direction: Direction },

    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Payment is already confirmed")]
    PaymentAlreadyConfirmed,

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid quantity {quantity} for product {product}")]
    InvalidQuantity { product: String, quantity: u32 },

    #[error("Product name cannot be empty")]
    InvalidProductName,

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Aggregate not initialized")]
    NotInitialized,
}

impl OrderError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::TerminalState { .. } => "terminal_state",
            OrderError::AlreadyCancelled => "already_cancelled",
            OrderError::PaymentAlreadyConfirmed => "payment_already_confirmed",
            OrderError::EmptyItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidProductName => "invalid_order",
            OrderError::UnknownStatus(_) => "unknown_status",
            OrderError::NotInitialized => "not_initialized",
        }
    }
}
