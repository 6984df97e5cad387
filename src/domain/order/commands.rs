use super::value_objects::{CustomerIdentity, DeliveryMethod, OrderLineItem, OrderStatus};

// ============================================================================
// Order Commands - Represent caller intent
// ============================================================================

/// Commands against an existing order. Placement goes through `Order::place`.
#[derive(Debug, Clone)]
pub enum OrderCommand {
    SetStatus {
        target: OrderStatus,
        max_jump: usize,
        updated_by: String,
        notes: Option<String>,
    },
    Advance {
        updated_by: String,
    },
    Revert {
        updated_by: String,
    },
    Cancel {
        updated_by: String,
        reason: Option<String>,
    },
    /// pending → baking and nothing else
    Promote {
        updated_by: String,
    },
    ConfirmPayment {
        confirmed_by: String,
    },
}

impl OrderCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::SetStatus { .. } => "set_status",
            OrderCommand::Advance { .. } => "advance",
            OrderCommand::Revert { .. } => "revert",
            OrderCommand::Cancel { .. } => "cancel",
            OrderCommand::Promote { .. } => "promote",
            OrderCommand::ConfirmPayment { .. } => "confirm_payment",
        }
    }

    pub fn actor(&self) -> &str {
        match self {
            OrderCommand::SetStatus { updated_by, .. }
            | OrderCommand::Advance { updated_by }
            | OrderCommand::Revert { updated_by }
            | OrderCommand::Cancel { updated_by, .. }
            | OrderCommand::Promote { updated_by } => updated_by,
            OrderCommand::ConfirmPayment { confirmed_by } => confirmed_by,
        }
    }
}

/// Input for placing a new order, as produced by checkout or admin creation.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: CustomerIdentity,
    pub items: Vec<OrderLineItem>,
    pub delivery_method: DeliveryMethod,
}
