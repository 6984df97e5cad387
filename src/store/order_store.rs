use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::order::{NewOrder, Order, OrderCommand, OrderEvent, OrderStatus};
use crate::event_sourcing::{Aggregate, DomainEvent, EventEnvelope, EventLog};
use crate::metrics::Metrics;
use super::errors::{BatchFailure, BatchOutcome, StoreError};

// ============================================================================
// Order Store
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Log → live state
//
// Locking:
// - Every mutation holds the map's read lock plus the order's own mutex for
//   validation, event append and state update. Two commands on the same
//   order are serialized; commands on different orders run side by side.
// - `snapshot` and `place` take the map's write lock, so a snapshot never
//   observes a half-applied mutation.
//
// ============================================================================

pub struct OrderStore {
    orders: RwLock<HashMap<Uuid, Arc<Mutex<Order>>>>,
    event_log: Arc<EventLog<OrderEvent>>,
    max_jump: usize,
    metrics: Option<Arc<Metrics>>,
}

impl OrderStore {
    pub fn new(event_log: Arc<EventLog<OrderEvent>>, max_jump: usize) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            event_log,
            max_jump,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn event_log(&self) -> &Arc<EventLog<OrderEvent>> {
        &self.event_log
    }

    pub fn max_jump(&self) -> usize {
        self.max_jump
    }

    /// Place a new order. It starts `pending` with a single history entry.
    pub async fn place(&self, new_order: NewOrder, placed_by: &str) -> Result<Order, StoreError> {
        let order_id = Uuid::now_v7();
        let event = Order::place(order_id, &new_order, placed_by)?;
        let order = Order::apply_first_event(&event)?;

        let envelope = EventEnvelope::new(
            order_id,
            1,
            event.event_type().to_string(),
            event,
            Uuid::new_v4(),
        )
        .with_actor(placed_by);

        let mut orders = self.orders.write().await;
        self.event_log.append_events(order_id, 0, vec![envelope]).await?;
        orders.insert(order_id, Arc::new(Mutex::new(order.clone())));

        if let Some(metrics) = &self.metrics {
            metrics.orders_placed.inc();
        }

        tracing::info!(
            order_id = %order_id,
            customer = %order.customer.name,
            item_count = order.items.len(),
            total_cents = order.total_cents(),
            "Order placed"
        );

        Ok(order)
    }

    pub async fn get(&self, order_id: Uuid) -> Result<Order, StoreError> {
        let orders = self.orders.read().await;
        let slot = orders.get(&order_id).ok_or(StoreError::NotFound(order_id))?;
        let order = slot.lock().await;
        Ok(order.clone())
    }

    /// Run one command against one order as a single critical section.
    /// On any failure nothing is appended and the order is left untouched.
    pub async fn execute(
        &self,
        order_id: Uuid,
        command: OrderCommand,
        correlation_id: Uuid,
    ) -> Result<Order, StoreError> {
        let orders = self.orders.read().await;
        let slot = orders.get(&order_id).ok_or_else(|| {
            tracing::warn!(order_id = %order_id, command = command.name(), "Order not found");
            self.record_rejection(command.name(), "not_found");
            StoreError::NotFound(order_id)
        })?;
        let mut order = slot.lock().await;

        let events = order.handle_command(&command).map_err(|e| {
            tracing::warn!(
                order_id = %order_id,
                command = command.name(),
                status = %order.status,
                updated_by = command.actor(),
                error = %e,
                "Command rejected"
            );
            self.record_rejection(command.name(), e.kind());
            e
        })?;

        let expected_version = order.version();
        let mut next = order.clone();
        let mut envelopes = Vec::with_capacity(events.len());

        for (offset, event) in events.into_iter().enumerate() {
            next.apply_event(&event)?;
            envelopes.push(
                EventEnvelope::new(
                    order_id,
                    expected_version + offset as i64 + 1,
                    event.event_type().to_string(),
                    event,
                    correlation_id,
                )
                .with_actor(command.actor()),
            );
        }

        self.event_log.append_events(order_id, expected_version, envelopes).await?;

        tracing::info!(
            order_id = %order_id,
            command = command.name(),
            from = %order.status,
            to = %next.status,
            updated_by = command.actor(),
            version = next.version,
            "Order updated"
        );

        if let Some(metrics) = &self.metrics {
            if order.status != next.status {
                metrics.record_transition(order.status.as_str(), next.status.as_str());
            }
        }

        *order = next;
        Ok(order.clone())
    }

    /// Direct-set using the store's configured forward jump bound.
    pub async fn set_status(
        &self,
        order_id: Uuid,
        target: OrderStatus,
        updated_by: &str,
        notes: Option<String>,
    ) -> Result<Order, StoreError> {
        let command = self.set_status_command(target, updated_by, notes);
        self.execute(order_id, command, Uuid::new_v4()).await
    }

    pub async fn advance(&self, order_id: Uuid, updated_by: &str) -> Result<Order, StoreError> {
        let command = OrderCommand::Advance { updated_by: updated_by.to_string() };
        self.execute(order_id, command, Uuid::new_v4()).await
    }

    pub async fn revert(&self, order_id: Uuid, updated_by: &str) -> Result<Order, StoreError> {
        let command = OrderCommand::Revert { updated_by: updated_by.to_string() };
        self.execute(order_id, command, Uuid::new_v4()).await
    }

    pub async fn cancel(
        &self,
        order_id: Uuid,
        updated_by: &str,
        reason: Option<String>,
    ) -> Result<Order, StoreError> {
        let command = OrderCommand::Cancel { updated_by: updated_by.to_string(), reason };
        self.execute(order_id, command, Uuid::new_v4()).await
    }

    /// The "mark paid" signal from the payment webhook.
    pub async fn confirm_payment(&self, order_id: Uuid, confirmed_by: &str) -> Result<Order, StoreError> {
        let command = OrderCommand::ConfirmPayment { confirmed_by: confirmed_by.to_string() };
        self.execute(order_id, command, Uuid::new_v4()).await
    }

    /// Apply `set_status` to every id independently. All ids are attempted;
    /// failures are reported per id and never undo the successes.
    pub async fn bulk_set_status(
        &self,
        order_ids: &[Uuid],
        target: OrderStatus,
        updated_by: &str,
        notes: Option<String>,
    ) -> BatchOutcome {
        let correlation_id = Uuid::new_v4();

        let results = join_all(order_ids.iter().map(|id| {
            let command = self.set_status_command(target, updated_by, notes.clone());
            self.execute(*id, command, correlation_id)
        }))
        .await;

        let mut outcome = BatchOutcome::default();
        for (id, result) in order_ids.iter().zip(results) {
            match result {
                Ok(_) => outcome.succeeded.push(*id),
                Err(reason) => outcome.failed.push(BatchFailure { id: *id, reason }),
            }
        }

        tracing::info!(
            target_status = %target,
            updated_by = updated_by,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Bulk status update finished"
        );

        outcome
    }

    /// Every order at one consistent point in time, oldest first.
    pub async fn snapshot(&self) -> Vec<Order> {
        let orders = self.orders.write().await;

        let mut snapshot = Vec::with_capacity(orders.len());
        for slot in orders.values() {
            snapshot.push(slot.lock().await.clone());
        }
        snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        snapshot
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn record_rejection(&self, command: &str, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(command, reason);
        }
    }

    fn set_status_command(&self, target: OrderStatus, updated_by: &str, notes: Option<String>) -> OrderCommand {
        OrderCommand::SetStatus {
            target,
            max_jump: self.max_jump,
            updated_by: updated_by.to_string(),
            notes,
        }
    }
}
