use std::collections::BTreeSet;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::order::{Order, OrderCommand};
use crate::store::{BatchFailure, OrderStore, StoreError};
use super::queue::{build_queue, eligible_for_promotion, BakingQueue};

// ============================================================================
// Baking Queue Aggregator
// ============================================================================
//
// Owns the operator-maintained set of products marked baking-complete for
// the current session. Marking a product may cascade: every pending order
// whose products are now all complete is promoted to `baking`.
//
// Promotion is one-way. Unmarking a product never reverts an order.
//
// ============================================================================

/// Orders promoted by one mark, plus those whose promotion was rejected
/// because they changed after the snapshot was taken.
#[derive(Debug, Default)]
pub struct PromotionOutcome {
    pub promoted: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
}

pub struct BakingQueueAggregator {
    completed: Mutex<BTreeSet<String>>,
    requires_payment: bool,
}

impl BakingQueueAggregator {
    pub fn new(requires_payment: bool) -> Self {
        Self {
            completed: Mutex::new(BTreeSet::new()),
            requires_payment,
        }
    }

    pub async fn compute_queue(&self, orders: &[Order]) -> BakingQueue {
        let completed = self.completed.lock().await;
        let queue = build_queue(orders, &completed, self.requires_payment);

        tracing::debug!(
            products = queue.len(),
            completed = completed.len(),
            "Recomputed baking queue"
        );

        queue
    }

    pub fn orders_eligible_for_promotion<'a>(
        &self,
        orders: &'a [Order],
        completed: &BTreeSet<String>,
    ) -> Vec<&'a Order> {
        eligible_for_promotion(orders, completed, self.requires_payment)
    }

    /// Mark `product_name` complete and promote every order that became
    /// eligible. Re-marking a completed product is a no-op.
    ///
    /// The completed set stays locked for the whole cascade so two marks
    /// never race to promote the same order.
    pub async fn mark_product_completed(
        &self,
        product_name: &str,
        store: &OrderStore,
        updated_by: &str,
    ) -> PromotionOutcome {
        let mut completed = self.completed.lock().await;

        if !completed.insert(product_name.to_string()) {
            tracing::debug!(product = product_name, "Product already marked complete");
            return PromotionOutcome::default();
        }

        let snapshot = store.snapshot().await;
        let candidates: Vec<Uuid> = self
            .orders_eligible_for_promotion(&snapshot, &completed)
            .into_iter()
            .map(|order| order.id)
            .collect();

        let outcome = promote_candidates(&candidates, store, updated_by).await;

        tracing::info!(
            product = product_name,
            updated_by = updated_by,
            promoted = outcome.promoted.len(),
            failed = outcome.failed.len(),
            "🍪 Product marked baking complete"
        );

        outcome
    }

    /// Re-check one order against the current completed set and promote it
    /// if it now qualifies. Used when an order becomes eligible for reasons
    /// other than a product mark, such as a late payment confirmation.
    pub async fn promote_if_eligible(
        &self,
        order_id: Uuid,
        store: &OrderStore,
        updated_by: &str,
    ) -> Result<Option<Order>, StoreError> {
        let completed = self.completed.lock().await;

        let order = store.get(order_id).await?;
        if self.orders_eligible_for_promotion(std::slice::from_ref(&order), &completed).is_empty() {
            return Ok(None);
        }

        let command = OrderCommand::Promote { updated_by: updated_by.to_string() };
        let promoted = store.execute(order_id, command, Uuid::new_v4()).await?;
        tracing::info!(order_id = %order_id, updated_by = updated_by, "🍪 Late order promoted to baking");

        Ok(Some(promoted))
    }

    /// Returns whether the product was marked.
    pub async fn unmark_product_completed(&self, product_name: &str) -> bool {
        let removed = self.completed.lock().await.remove(product_name);
        if removed {
            tracing::info!(product = product_name, "Product unmarked");
        }
        removed
    }

    /// Start a new baking run with nothing marked complete.
    pub async fn reset_session(&self) {
        let mut completed = self.completed.lock().await;
        let cleared = completed.len();
        completed.clear();
        tracing::info!(cleared = cleared, "Baking session reset");
    }

    pub async fn completed_products(&self) -> BTreeSet<String> {
        self.completed.lock().await.clone()
    }
}

/// Send `Promote` to every candidate under one correlation id. Candidates
/// come from an earlier snapshot; any that moved since then land in `failed`.
async fn promote_candidates(candidates: &[Uuid], store: &OrderStore, updated_by: &str) -> PromotionOutcome {
    let correlation_id = Uuid::new_v4();
    let results = join_all(candidates.iter().map(|id| {
        let command = OrderCommand::Promote { updated_by: updated_by.to_string() };
        store.execute(*id, command, correlation_id)
    }))
    .await;

    let mut outcome = PromotionOutcome::default();
    for (id, result) in candidates.iter().zip(results) {
        match result {
            Ok(_) => outcome.promoted.push(*id),
            Err(reason) => {
                tracing::warn!(order_id = %id, error = %reason, "Promotion skipped");
                outcome.failed.push(BatchFailure { id: *id, reason });
            }
        }
    }
    outcome
}
