use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

// ============================================================================
// Baking Queue - derived per-product production view
// ============================================================================
//
// Nothing here is stored. The queue is rebuilt from order state on every
// read; only the operator's "completed" marks live elsewhere.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BakingQueueEntry {
    pub product_name: String,
    pub total_quantity: u64,
    pub order_count: usize,
    /// Sorted, distinct
    pub order_ids: Vec<Uuid>,
    /// Sorted, distinct
    pub customer_names: Vec<String>,
    pub completed: bool,
}

pub type BakingQueue = BTreeMap<String, BakingQueueEntry>;

#[derive(Default)]
struct Accumulator {
    total_quantity: u64,
    order_ids: BTreeSet<Uuid>,
    customer_names: BTreeSet<String>,
}

fn counts_toward_queue(order: &Order, requires_payment: bool) -> bool {
    order.status.is_in_production() && (order.payment_confirmed || !requires_payment)
}

/// Aggregate line items of every in-production order by product name.
/// The result does not depend on the order of `orders`.
pub fn build_queue(
    orders: &[Order],
    completed: &BTreeSet<String>,
    requires_payment: bool,
) -> BakingQueue {
    let mut accumulators: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for order in orders.iter().filter(|o| counts_toward_queue(o, requires_payment)) {
        for item in &order.items {
            let acc = accumulators.entry(item.product_name.as_str()).or_default();
            acc.total_quantity += u64::from(item.quantity);
            acc.order_ids.insert(order.id);
            acc.customer_names.insert(order.customer.name.clone());
        }
    }

    accumulators
        .into_iter()
        .map(|(product_name, acc)| {
            let entry = BakingQueueEntry {
                product_name: product_name.to_string(),
                total_quantity: acc.total_quantity,
                order_count: acc.order_ids.len(),
                order_ids: acc.order_ids.into_iter().collect(),
                customer_names: acc.customer_names.into_iter().collect(),
                completed: completed.contains(product_name),
            };
            (product_name.to_string(), entry)
        })
        .collect()
}

/// Pending orders whose every product is in `completed`. A partial set of
/// completed products never qualifies an order.
pub fn eligible_for_promotion<'a>(
    orders: &'a [Order],
    completed: &BTreeSet<String>,
    requires_payment: bool,
) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|order| order.status == OrderStatus::Pending)
        .filter(|order| order.payment_confirmed || !requires_payment)
        .filter(|order| {
            order
                .product_names()
                .iter()
                .all(|product| completed.contains(*product))
        })
        .collect()
}
