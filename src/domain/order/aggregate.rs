use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::event_sourcing::core::Aggregate;
use super::value_objects::{
    CustomerIdentity, DeliveryMethod, OrderLineItem, OrderStatus, StatusHistoryEntry,
};
use super::events::*;
use super::commands::{NewOrder, OrderCommand};
use super::errors::{Direction, OrderError};
use super::policy::StatusTransitionPolicy;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub version: i64,

    // Current State (derived from events)
    pub customer: CustomerIdentity,
    pub items: Vec<OrderLineItem>,
    pub status: OrderStatus,
    pub payment_confirmed: bool,
    pub delivery_method: DeliveryMethod,

    // Audit Trail. The last entry always carries the current status.
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Validate a new order and produce its first event.
    pub fn place(order_id: Uuid, new_order: &NewOrder, placed_by: &str) -> Result<OrderEvent, OrderError> {
        validate_items(&new_order.items)?;

        Ok(OrderEvent::Placed(OrderPlaced {
            order_id,
            customer: new_order.customer.clone(),
            items: new_order.items.clone(),
            delivery_method: new_order.delivery_method,
            placed_by: placed_by.to_string(),
            placed_at: Utc::now(),
        }))
    }

    pub fn total_cents(&self) -> u64 {
        self.items
            .iter()
            .map(OrderLineItem::line_total_cents)
            .fold(0, u64::saturating_add)
    }

    /// Distinct product names across the order's line items.
    pub fn product_names(&self) -> BTreeSet<&str> {
        self.items.iter().map(|item| item.product_name.as_str()).collect()
    }

    /// History timestamps never go backwards, even if the wall clock does.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.status_history.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    fn status_change(&self, to: OrderStatus, updated_by: &str, notes: Option<String>) -> OrderEvent {
        OrderEvent::StatusChanged(OrderStatusChanged {
            from: self.status,
            to,
            updated_by: updated_by.to_string(),
            notes,
            changed_at: self.next_timestamp(),
        })
    }
}

fn validate_items(items: &[OrderLineItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    for item in items {
        if item.product_name.trim().is_empty() {
            return Err(OrderError::InvalidProductName);
        }
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product: item.product_name.clone(),
                quantity: item.quantity,
            });
        }
    }

    Ok(())
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Placed(e) => Ok(Self {
                id: e.order_id,
                version: 1,
                customer: e.customer.clone(),
                items: e.items.clone(),
                status: OrderStatus::Pending,
                payment_confirmed: false,
                delivery_method: e.delivery_method,
                status_history: vec![StatusHistoryEntry {
                    status: OrderStatus::Pending,
                    timestamp: e.placed_at,
                    updated_by: e.placed_by.clone(),
                    notes: Some("Order placed".to_string()),
                }],
                created_at: e.placed_at,
                updated_at: e.placed_at,
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            // Placed only ever opens a stream
            OrderEvent::Placed(_) => return Err(OrderError::NotInitialized),
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.status_history.push(StatusHistoryEntry {
                    status: e.to,
                    timestamp: e.changed_at,
                    updated_by: e.updated_by.clone(),
                    notes: e.notes.clone(),
                });
                self.updated_at = e.changed_at;
            }
            OrderEvent::PaymentConfirmed(e) => {
                self.payment_confirmed = true;
                self.updated_at = e.confirmed_at;
            }
        }

        self.version += 1;
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::SetStatus { target, max_jump, updated_by, notes } => {
                if !StatusTransitionPolicy::can_jump_to(self.status, *target, *max_jump) {
                    return Err(OrderError::InvalidTransition { from: self.status, to: *target });
                }

                Ok(vec![self.status_change(*target, updated_by, notes.clone())])
            }

            OrderCommand::Advance { updated_by } => {
                let next = StatusTransitionPolicy::next_status(self.status).ok_or(
                    OrderError::TerminalState { status: self.status, direction: Direction::Forward },
                )?;

                Ok(vec![self.status_change(next, updated_by, None)])
            }

            OrderCommand::Revert { updated_by } => {
                let previous = StatusTransitionPolicy::previous_status(self.status).ok_or(
                    OrderError::TerminalState { status: self.status, direction: Direction::Backward },
                )?;

                Ok(vec![self.status_change(previous, updated_by, None)])
            }

            OrderCommand::Cancel { updated_by, reason } => {
                if !StatusTransitionPolicy::can_cancel(self.status) {
                    return Err(OrderError::InvalidTransition {
                        from: self.status,
                        to: OrderStatus::Cancelled,
                    });
                }

                Ok(vec![self.status_change(OrderStatus::Cancelled, updated_by, reason.clone())])
            }

            OrderCommand::Promote { updated_by } => {
                if self.status != OrderStatus::Pending {
                    return Err(OrderError::InvalidTransition {
                        from: self.status,
                        to: OrderStatus::Baking,
                    });
                }

                Ok(vec![self.status_change(
                    OrderStatus::Baking,
                    updated_by,
                    Some("All products marked baking complete".to_string()),
                )])
            }

            OrderCommand::ConfirmPayment { confirmed_by } => {
                if self.status == OrderStatus::Cancelled {
                    return Err(OrderError::AlreadyCancelled);
                }
                if self.payment_confirmed {
                    return Err(OrderError::PaymentAlreadyConfirmed);
                }

                Ok(vec![OrderEvent::PaymentConfirmed(OrderPaymentConfirmed {
                    confirmed_by: confirmed_by.clone(),
                    confirmed_at: Utc::now(),
                })])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
