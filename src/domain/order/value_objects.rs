use std::fmt;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Order lifecycle status.
///
/// The first five variants form the happy path, in order. `Cancelled` is an
/// absorbing side-exit and has no position on that path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Baking,
    Ready,
    Packed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const HAPPY_PATH: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Baking,
        OrderStatus::Ready,
        OrderStatus::Packed,
        OrderStatus::Delivered,
    ];

    /// Position on the happy path, `None` for `Cancelled`.
    pub fn happy_path_index(self) -> Option<usize> {
        Self::HAPPY_PATH.iter().position(|s| *s == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Orders in these statuses still owe product to the baking queue.
    pub fn is_in_production(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Baking)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Baking => "baking",
            OrderStatus::Ready => "ready",
            OrderStatus::Packed => "packed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Map a status string from either storefront vocabulary onto the
    /// canonical enum. The document-model names (`confirmed`, `preparing`,
    /// `out_for_delivery`) fold into their nearest happy-path step.
    pub fn from_external(raw: &str) -> Result<Self, OrderError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "confirmed" => Ok(OrderStatus::Pending),
            "baking" | "preparing" => Ok(OrderStatus::Baking),
            "ready" => Ok(OrderStatus::Ready),
            "packed" | "out_for_delivery" => Ok(OrderStatus::Packed),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(OrderError::UnknownStatus(raw.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Pickup,
    Shipping,
}

/// Who placed the order. Display and grouping only, never an auth identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentity {
    pub name: String,
    pub email: String,
}

impl CustomerIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

impl OrderLineItem {
    pub fn new(product_name: impl Into<String>, quantity: u32, unit_price_cents: u64) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// Saturates at `u64::MAX` rather than overflowing.
    pub fn line_total_cents(&self) -> u64 {
        self.unit_price_cents.saturating_mul(u64::from(self.quantity))
    }
}

/// One row of an order's append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub updated_by: String,
    pub notes: Option<String>,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_index() {
        assert_eq!(OrderStatus::Pending.happy_path_index(), Some(0));
        assert_eq!(OrderStatus::Delivered.happy_path_index(), Some(4));
        assert_eq!(OrderStatus::Cancelled.happy_path_index(), None);
    }

    #[test]
    fn test_terminal_and_production_flags() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Packed.is_terminal());

        assert!(OrderStatus::Pending.is_in_production());
        assert!(OrderStatus::Baking.is_in_production());
        assert!(!OrderStatus::Ready.is_in_production());
    }

    #[test]
    fn test_order_status_serializes_as_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Baking).unwrap();
        assert_eq!(json, "\"baking\"");
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_external_vocabulary_mapping() {
        assert_eq!(OrderStatus::from_external("confirmed").unwrap(), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_external("preparing").unwrap(), OrderStatus::Baking);
        assert_eq!(OrderStatus::from_external("out_for_delivery").unwrap(), OrderStatus::Packed);
        assert_eq!(OrderStatus::from_external(" Delivered ").unwrap(), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from_external("canceled").unwrap(), OrderStatus::Cancelled);

        let err = OrderStatus::from_external("shipped").unwrap_err();
        assert!(matches!(err, OrderError::UnknownStatus(s) if s == "shipped"));
    }

    #[test]
    fn test_line_total() {
        let item = OrderLineItem::new("Chocolate Chip", 3, 250);
        assert_eq!(item.line_total_cents(), 750);
    }

    #[test]
    fn test_line_total_saturates_on_huge_prices() {
        let item = OrderLineItem::new("Wedding Cake", 3, u64::MAX / 2);
        assert_eq!(item.line_total_cents(), u64::MAX);
    }
}
