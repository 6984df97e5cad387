use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{CustomerIdentity, DeliveryMethod, OrderLineItem, OrderStatus};

// ============================================================================
// Order Events - Domain Events for the Order Aggregate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    StatusChanged(OrderStatusChanged),
    PaymentConfirmed(OrderPaymentConfirmed),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::StatusChanged(_) => "OrderStatusChanged",
            OrderEvent::PaymentConfirmed(_) => "OrderPaymentConfirmed",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Initial event in the order lifecycle; the order starts `pending`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub customer: CustomerIdentity,
    pub items: Vec<OrderLineItem>,
    pub delivery_method: DeliveryMethod,
    pub placed_by: String,
    pub placed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderStatusChanged {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub updated_by: String,
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderPaymentConfirmed {
    pub confirmed_by: String,
    pub confirmed_at: DateTime<Utc>,
}
