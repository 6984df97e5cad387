use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use uuid::Uuid;

use crate::admin::{ActionRateLimiter, AdminPermissions, Capability};
use crate::baking::{BakingQueue, BakingQueueAggregator, PromotionOutcome};
use crate::config::EngineConfig;
use crate::domain::order::{NewOrder, Order, OrderCommand, OrderStatus, StatusHistoryEntry};
use crate::event_sourcing::EventLog;
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;
use crate::store::{BatchOutcome, OrderStore, StoreError};

// ============================================================================
// Order Fulfillment Engine - public contract of the core
// ============================================================================
//
// Inbound:  FulfillmentCommand (admin UI / API), place_order (checkout),
//           confirm_payment (payment webhook)
// Outbound: snapshot, baking_queue, status_history, outbox publishing
//
// `updated_by` is stored verbatim. Authentication happens before the engine.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{actor} is not allowed to manage {capability:?}")]
    PermissionDenied { actor: String, capability: Capability },

    #[error("{0} is sending admin actions too quickly")]
    RateLimited(String),
}

#[derive(Debug, Clone)]
pub enum FulfillmentCommand {
    Advance {
        order_id: Uuid,
    },
    Revert {
        order_id: Uuid,
    },
    /// `max_jump: None` uses the configured bound
    SetStatus {
        order_id: Uuid,
        target: OrderStatus,
        max_jump: Option<usize>,
        notes: Option<String>,
    },
    BulkSetStatus {
        order_ids: Vec<Uuid>,
        target: OrderStatus,
        notes: Option<String>,
    },
    Cancel {
        order_id: Uuid,
        reason: Option<String>,
    },
    MarkBakingComplete {
        product_name: String,
    },
    UnmarkBakingComplete {
        product_name: String,
    },
    ResetBakingSession,
}

impl FulfillmentCommand {
    pub fn name(&self) -> &'static str {
        match self {
            FulfillmentCommand::Advance { .. } => "advance",
            FulfillmentCommand::Revert { .. } => "revert",
            FulfillmentCommand::SetStatus { .. } => "set_status",
            FulfillmentCommand::BulkSetStatus { .. } => "bulk_set_status",
            FulfillmentCommand::Cancel { .. } => "cancel",
            FulfillmentCommand::MarkBakingComplete { .. } => "mark_baking_complete",
            FulfillmentCommand::UnmarkBakingComplete { .. } => "unmark_baking_complete",
            FulfillmentCommand::ResetBakingSession => "reset_baking_session",
        }
    }

    /// Order status changes need `orders`; baking-board actions need `products`.
    pub fn required_capability(&self) -> Capability {
        match self {
            FulfillmentCommand::MarkBakingComplete { .. }
            | FulfillmentCommand::UnmarkBakingComplete { .. }
            | FulfillmentCommand::ResetBakingSession => Capability::Products,
            _ => Capability::Orders,
        }
    }
}

#[derive(Debug)]
pub enum CommandOutcome {
    Order(Order),
    Batch(BatchOutcome),
    Promotion(PromotionOutcome),
    /// Unmark result: whether the product had been marked
    Unmarked(bool),
    SessionReset,
}

pub struct OrderFulfillmentEngine {
    config: EngineConfig,
    store: OrderStore,
    baking: BakingQueueAggregator,
    rate_limiter: ActionRateLimiter,
    metrics: Arc<Metrics>,
}

impl OrderFulfillmentEngine {
    pub fn new(config: EngineConfig, metrics: Arc<Metrics>) -> Self {
        let store = OrderStore::new(Arc::new(EventLog::new("Order")), config.max_jump)
            .with_metrics(metrics.clone());
        let baking = BakingQueueAggregator::new(config.queue_requires_payment);
        let rate_limiter =
            ActionRateLimiter::new(config.rate_limit_max_actions, config.rate_limit_window());

        Self {
            config,
            store,
            baking,
            rate_limiter,
            metrics,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn rate_limiter(&self) -> &ActionRateLimiter {
        &self.rate_limiter
    }

    pub async fn place_order(&self, new_order: NewOrder, placed_by: &str) -> Result<Order, EngineError> {
        Ok(self.store.place(new_order, placed_by).await?)
    }

    /// Payment webhook signal. Independent of the status enum.
    ///
    /// With the payment gate on, an order paid after its products were all
    /// marked complete is promoted here, since no later mark will reach it.
    pub async fn confirm_payment(&self, order_id: Uuid, confirmed_by: &str) -> Result<Order, EngineError> {
        let order = self.store.confirm_payment(order_id, confirmed_by).await?;

        match self.baking.promote_if_eligible(order_id, &self.store, confirmed_by).await? {
            Some(promoted) => {
                self.metrics.baking_promotions.inc();
                Ok(promoted)
            }
            None => Ok(order),
        }
    }

    pub fn authorize(
        &self,
        actor: &str,
        permissions: &AdminPermissions,
        capability: Capability,
    ) -> Result<(), EngineError> {
        if permissions.allows(capability) {
            Ok(())
        } else {
            Err(EngineError::PermissionDenied { actor: actor.to_string(), capability })
        }
    }

    /// Check capability and rate limit for `actor`, then run the command
    /// with `actor` recorded as `updated_by`.
    pub async fn execute_as(
        &self,
        actor: &str,
        permissions: &AdminPermissions,
        command: FulfillmentCommand,
    ) -> Result<CommandOutcome, EngineError> {
        if let Err(e) = self.authorize(actor, permissions, command.required_capability()) {
            tracing::warn!(actor = actor, command = command.name(), "Permission denied");
            self.metrics.record_rejection(command.name(), "permission_denied");
            return Err(e);
        }

        if !self.rate_limiter.check(actor).await {
            tracing::warn!(actor = actor, command = command.name(), "Rate limited");
            self.metrics.record_rejection(command.name(), "rate_limited");
            return Err(EngineError::RateLimited(actor.to_string()));
        }

        self.execute(command, actor).await
    }

    pub async fn execute(
        &self,
        command: FulfillmentCommand,
        updated_by: &str,
    ) -> Result<CommandOutcome, EngineError> {
        let name = command.name();
        let started = Instant::now();

        let outcome = match command {
            FulfillmentCommand::Advance { order_id } => {
                CommandOutcome::Order(self.store.advance(order_id, updated_by).await?)
            }
            FulfillmentCommand::Revert { order_id } => {
                CommandOutcome::Order(self.store.revert(order_id, updated_by).await?)
            }
            FulfillmentCommand::SetStatus { order_id, target, max_jump, notes } => {
                let command = OrderCommand::SetStatus {
                    target,
                    max_jump: max_jump.unwrap_or(self.config.max_jump),
                    updated_by: updated_by.to_string(),
                    notes,
                };
                CommandOutcome::Order(self.store.execute(order_id, command, Uuid::new_v4()).await?)
            }
            FulfillmentCommand::BulkSetStatus { order_ids, target, notes } => {
                let outcome = self.store.bulk_set_status(&order_ids, target, updated_by, notes).await;
                for failure in &outcome.failed {
                    tracing::warn!(order_id = %failure.id, error = %failure.reason, "Bulk item failed");
                }
                CommandOutcome::Batch(outcome)
            }
            FulfillmentCommand::Cancel { order_id, reason } => {
                CommandOutcome::Order(self.store.cancel(order_id, updated_by, reason).await?)
            }
            FulfillmentCommand::MarkBakingComplete { product_name } => {
                let outcome = self
                    .baking
                    .mark_product_completed(&product_name, &self.store, updated_by)
                    .await;
                self.metrics.baking_promotions.inc_by(outcome.promoted.len() as u64);
                CommandOutcome::Promotion(outcome)
            }
            FulfillmentCommand::UnmarkBakingComplete { product_name } => {
                CommandOutcome::Unmarked(self.baking.unmark_product_completed(&product_name).await)
            }
            FulfillmentCommand::ResetBakingSession => {
                self.baking.reset_session().await;
                CommandOutcome::SessionReset
            }
        };

        self.metrics.observe_command(name, started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Read models
    // ------------------------------------------------------------------

    pub async fn snapshot(&self) -> Vec<Order> {
        self.store.snapshot().await
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, EngineError> {
        Ok(self.store.get(order_id).await?)
    }

    pub async fn status_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>, EngineError> {
        Ok(self.store.get(order_id).await?.status_history)
    }

    pub async fn baking_queue(&self) -> BakingQueue {
        let snapshot = self.store.snapshot().await;
        let queue = self.baking.compute_queue(&snapshot).await;
        self.metrics.baking_queue_products.set(queue.len() as i64);
        queue
    }

    pub async fn completed_products(&self) -> BTreeSet<String> {
        self.baking.completed_products().await
    }

    /// Drain the outbox into `publisher`. On the first failure the failed
    /// envelope and everything after it go back to the outbox.
    pub async fn publish_pending(&self, publisher: &dyn EventPublisher) -> anyhow::Result<usize> {
        let log = self.store.event_log();
        let mut pending = log.drain_outbox().await.into_iter();
        let mut published = 0;

        while let Some(envelope) = pending.next() {
            if let Err(e) = publisher.publish(&envelope).await {
                let mut unpublished = vec![envelope];
                unpublished.extend(pending);
                log.requeue(unpublished).await;
                self.metrics.outbox_published.inc_by(published as u64);
                return Err(e).context(format!("Publishing stopped after {} events", published));
            }
            published += 1;
        }

        self.metrics.outbox_published.inc_by(published as u64);
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::domain::order::{
        CustomerIdentity, DeliveryMethod, OrderError, OrderEvent, OrderLineItem,
    };
    use crate::event_sourcing::EventEnvelope;

    const ADMIN: &str = "admin-7";

    fn engine() -> OrderFulfillmentEngine {
        OrderFulfillmentEngine::new(EngineConfig::default(), Arc::new(Metrics::new().unwrap()))
    }

    async fn paid_order(engine: &OrderFulfillmentEngine, customer: &str, items: &[(&str, u32)]) -> Uuid {
        let new_order = NewOrder {
            customer: CustomerIdentity::new(customer, format!("{customer}@example.com")),
            items: items.iter().map(|(p, q)| OrderLineItem::new(*p, *q, 350)).collect(),
            delivery_method: DeliveryMethod::Pickup,
        };
        let id = engine.place_order(new_order, "checkout").await.unwrap().id;
        engine.confirm_payment(id, "stripe_webhook").await.unwrap();
        id
    }

    fn order_of(outcome: CommandOutcome) -> Order {
        match outcome {
            CommandOutcome::Order(order) => order,
            other => panic!("expected an order, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_baking_board_flow() {
        let engine = engine();
        let o1 = paid_order(&engine, "o1", &[("Chip", 2)]).await;
        let o2 = paid_order(&engine, "o2", &[("Chip", 1), ("Brownie", 3)]).await;
        let o3 = paid_order(&engine, "o3", &[("Brownie", 5)]).await;

        let queue = engine.baking_queue().await;
        assert_eq!(queue["Chip"].total_quantity, 3);
        assert_eq!(queue["Brownie"].total_quantity, 8);

        let chip = FulfillmentCommand::MarkBakingComplete { product_name: "Chip".into() };
        match engine.execute(chip, "auto-baking-system").await.unwrap() {
            CommandOutcome::Promotion(outcome) => assert_eq!(outcome.promoted, vec![o1]),
            other => panic!("unexpected outcome {other:?}"),
        }

        let brownie = FulfillmentCommand::MarkBakingComplete { product_name: "Brownie".into() };
        match engine.execute(brownie, "auto-baking-system").await.unwrap() {
            CommandOutcome::Promotion(outcome) => {
                assert_eq!(outcome.promoted.len(), 2);
                assert!(outcome.promoted.contains(&o2) && outcome.promoted.contains(&o3));
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        assert_eq!(
            engine.completed_products().await.into_iter().collect::<Vec<_>>(),
            vec!["Brownie".to_string(), "Chip".to_string()]
        );

        let text = engine.metrics.render().unwrap();
        assert!(text.contains("baking_promotions_total 3"));
        assert!(text.contains(r#"order_status_transitions_total{from="pending",to="baking"} 3"#));
    }

    #[tokio::test]
    async fn test_set_status_uses_configured_jump_unless_overridden() {
        let engine = engine();
        let id = paid_order(&engine, "o1", &[("Chip", 1)]).await;

        let too_far = FulfillmentCommand::SetStatus {
            order_id: id,
            target: OrderStatus::Packed,
            max_jump: None,
            notes: None,
        };
        let err = engine.execute(too_far, ADMIN).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Store(StoreError::Order(OrderError::InvalidTransition { .. }))
        ));

        let overridden = FulfillmentCommand::SetStatus {
            order_id: id,
            target: OrderStatus::Packed,
            max_jump: Some(3),
            notes: Some("rush order".into()),
        };
        let order = order_of(engine.execute(overridden, ADMIN).await.unwrap());
        assert_eq!(order.status, OrderStatus::Packed);
        assert_eq!(order.status_history.last().unwrap().notes.as_deref(), Some("rush order"));
    }

    #[tokio::test]
    async fn test_bulk_set_status_reports_missing_ids() {
        let engine = engine();
        let a = paid_order(&engine, "a", &[("Chip", 1)]).await;
        let c = paid_order(&engine, "c", &[("Chip", 1)]).await;
        let missing = Uuid::new_v4();

        let command = FulfillmentCommand::BulkSetStatus {
            order_ids: vec![a, missing, c],
            target: OrderStatus::Baking,
            notes: None,
        };
        let CommandOutcome::Batch(outcome) = engine.execute(command, ADMIN).await.unwrap() else {
            panic!("expected batch outcome");
        };

        assert_eq!(outcome.succeeded, vec![a, c]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(matches!(outcome.failed[0].reason, StoreError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_status_history_read_model() {
        let engine = engine();
        let id = paid_order(&engine, "o1", &[("Chip", 1)]).await;

        engine.execute(FulfillmentCommand::Advance { order_id: id }, ADMIN).await.unwrap();
        engine
            .execute(FulfillmentCommand::Cancel { order_id: id, reason: Some("oven broke".into()) }, ADMIN)
            .await
            .unwrap();

        let history = engine.status_history(id).await.unwrap();
        let statuses: Vec<OrderStatus> = history.iter().map(|h| h.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Pending, OrderStatus::Baking, OrderStatus::Cancelled]);
        assert_eq!(history[2].updated_by, ADMIN);

        let err = engine.execute(FulfillmentCommand::Revert { order_id: id }, ADMIN).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Order(OrderError::TerminalState { .. }))));

        assert!(matches!(
            engine.status_history(Uuid::new_v4()).await,
            Err(EngineError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_execute_as_checks_permissions() {
        let engine = engine();
        let id = paid_order(&engine, "o1", &[("Chip", 1)]).await;

        let err = engine
            .execute_as("viewer", &AdminPermissions::read_only(), FulfillmentCommand::Advance { order_id: id })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { capability: Capability::Orders, .. }));

        let orders_only = AdminPermissions { orders: true, ..AdminPermissions::default() };
        let err = engine
            .execute_as("clerk", &orders_only, FulfillmentCommand::ResetBakingSession)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { capability: Capability::Products, .. }));

        let order = order_of(
            engine
                .execute_as("clerk", &orders_only, FulfillmentCommand::Advance { order_id: id })
                .await
                .unwrap(),
        );
        assert_eq!(order.status_history.last().unwrap().updated_by, "clerk");
    }

    #[tokio::test]
    async fn test_execute_as_rate_limits_per_actor() {
        let config = EngineConfig { rate_limit_max_actions: 2, ..EngineConfig::default() };
        let engine = OrderFulfillmentEngine::new(config, Arc::new(Metrics::new().unwrap()));
        let permissions = AdminPermissions::full();

        for _ in 0..2 {
            engine
                .execute_as("busy", &permissions, FulfillmentCommand::ResetBakingSession)
                .await
                .unwrap();
        }
        let err = engine
            .execute_as("busy", &permissions, FulfillmentCommand::ResetBakingSession)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RateLimited(actor) if actor == "busy"));

        assert!(engine
            .execute_as("calm", &permissions, FulfillmentCommand::ResetBakingSession)
            .await
            .is_ok());

        let text = engine.metrics.render().unwrap();
        assert!(text.contains(
            r#"order_commands_rejected_total{command="reset_baking_session",reason="rate_limited"} 1"#
        ));
    }

    struct FlakyPublisher {
        allowed: usize,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl EventPublisher for FlakyPublisher {
        async fn publish(&self, _envelope: &EventEnvelope<OrderEvent>) -> anyhow::Result<()> {
            if self.seen.fetch_add(1, Ordering::SeqCst) < self.allowed {
                Ok(())
            } else {
                anyhow::bail!("broker unavailable")
            }
        }
    }

    #[tokio::test]
    async fn test_publish_pending_requeues_on_failure() {
        let engine = engine();
        // placed + payment confirmed = 2 events each
        paid_order(&engine, "o1", &[("Chip", 1)]).await;
        paid_order(&engine, "o2", &[("Chip", 1)]).await;

        let flaky = FlakyPublisher { allowed: 3, seen: AtomicUsize::new(0) };
        assert!(engine.publish_pending(&flaky).await.is_err());
        assert_eq!(engine.store().event_log().outbox_len().await, 1);

        let healthy = crate::messaging::LogPublisher::new("order-events");
        assert_eq!(engine.publish_pending(&healthy).await.unwrap(), 1);
        assert_eq!(engine.store().event_log().outbox_len().await, 0);
    }

    #[tokio::test]
    async fn test_payment_after_marking_promotes_order() {
        let engine = engine();
        let new_order = NewOrder {
            customer: CustomerIdentity::new("late", "late@example.com"),
            items: vec![OrderLineItem::new("Chip", 1, 350)],
            delivery_method: DeliveryMethod::Shipping,
        };
        let id = engine.place_order(new_order, "checkout").await.unwrap().id;

        let chip = || FulfillmentCommand::MarkBakingComplete { product_name: "Chip".into() };
        engine.execute(chip(), "auto-baking-system").await.unwrap();
        assert_eq!(engine.get_order(id).await.unwrap().status, OrderStatus::Pending);

        let order = engine.confirm_payment(id, "stripe_webhook").await.unwrap();
        assert!(order.payment_confirmed);
        assert_eq!(order.status, OrderStatus::Baking);
        assert_eq!(order.status_history.last().unwrap().updated_by, "stripe_webhook");

        match engine.execute(chip(), "auto-baking-system").await.unwrap() {
            CommandOutcome::Promotion(outcome) => assert!(outcome.promoted.is_empty()),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(engine.metrics.render().unwrap().contains("baking_promotions_total 1"));
    }

    #[tokio::test]
    async fn test_payment_before_marking_stays_pending() {
        let engine = engine();
        let id = paid_order(&engine, "o1", &[("Chip", 1)]).await;
        assert_eq!(engine.get_order(id).await.unwrap().status, OrderStatus::Pending);
    }
}
