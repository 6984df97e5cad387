use anyhow::Result;
use async_trait::async_trait;

use crate::domain::order::OrderEvent;
use crate::event_sourcing::{serialize_event, EventEnvelope};

// ============================================================================
// Event Publisher - where outbox entries go
// ============================================================================

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope<OrderEvent>) -> Result<()>;
}

/// Publishes each envelope as a structured log line carrying its JSON
/// payload. Stands in for a broker until one is wired up.
pub struct LogPublisher {
    topic: String,
}

impl LogPublisher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into() }
    }
}

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, envelope: &EventEnvelope<OrderEvent>) -> Result<()> {
        let payload = serialize_event(&envelope.event_data)?;

        tracing::info!(
            topic = %self.topic,
            key = %envelope.aggregate_id,
            event_type = %envelope.event_type,
            sequence = envelope.sequence_number,
            correlation_id = %envelope.correlation_id,
            payload = %payload,
            "Published order event"
        );

        Ok(())
    }
}
