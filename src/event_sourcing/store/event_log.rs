use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use uuid::Uuid;
use anyhow::{Result, bail};

use crate::event_sourcing::core::{DomainEvent, EventEnvelope, Aggregate};

// ============================================================================
// Event Log - Append-only, in-memory event history with outbox
// ============================================================================
//
// Responsibilities:
// 1. Append events per aggregate (append-only, never reordered)
// 2. Load event history for aggregates
// 3. Optimistic concurrency control on the per-aggregate version
// 4. Queue appended events in an outbox for publishing
//
// Storage-agnostic: a durable backend replaces this type without touching
// the domain layer.
//
// ============================================================================

pub struct EventLog<E: DomainEvent> {
    aggregate_type_name: String,
    state: Mutex<EventLogState<E>>,
}

struct EventLogState<E> {
    streams: HashMap<Uuid, Vec<EventEnvelope<E>>>,
    outbox: VecDeque<EventEnvelope<E>>,
}

impl<E: DomainEvent> EventLog<E> {
    pub fn new(aggregate_type_name: &str) -> Self {
        Self {
            aggregate_type_name: aggregate_type_name.to_string(),
            state: Mutex::new(EventLogState {
                streams: HashMap::new(),
                outbox: VecDeque::new(),
            }),
        }
    }

    /// Append events to an aggregate's stream and the outbox.
    /// Returns the new version number after appending.
    pub async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64> {
        if events.is_empty() {
            bail!("Cannot append empty event list");
        }

        let mut state = self.state.lock().await;
        let stream = state.streams.entry(aggregate_id).or_default();

        let current_version = stream.len() as i64;
        if current_version != expected_version {
            bail!(
                "Concurrency conflict: expected version {}, but current is {}",
                expected_version,
                current_version
            );
        }

        for (offset, envelope) in events.iter().enumerate() {
            let expected_seq = expected_version + offset as i64 + 1;
            if envelope.aggregate_id != aggregate_id || envelope.sequence_number != expected_seq {
                bail!(
                    "Envelope {} out of sequence: got {} for {}, expected {} for {}",
                    envelope.event_id,
                    envelope.sequence_number,
                    envelope.aggregate_id,
                    expected_seq,
                    aggregate_id
                );
            }
        }

        let event_count = events.len();
        stream.extend(events.iter().cloned());
        let new_version = stream.len() as i64;
        state.outbox.extend(events);

        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type_name,
            new_version = new_version,
            event_count = event_count,
            "Appended events to event log"
        );

        Ok(new_version)
    }

    /// Load all events for an aggregate, in sequence order
    pub async fn load_events(&self, aggregate_id: Uuid) -> Vec<EventEnvelope<E>> {
        let state = self.state.lock().await;
        state.streams.get(&aggregate_id).cloned().unwrap_or_default()
    }

    pub async fn current_version(&self, aggregate_id: Uuid) -> i64 {
        let state = self.state.lock().await;
        state.streams.get(&aggregate_id).map_or(0, |s| s.len() as i64)
    }

    /// Rebuild an aggregate from its stored history
    pub async fn load_aggregate<A>(&self, aggregate_id: Uuid) -> Result<A>
    where
        A: Aggregate<Event = E>,
        <A as Aggregate>::Error: std::fmt::Display,
    {
        let events = self.load_events(aggregate_id).await;

        if events.is_empty() {
            bail!("Aggregate not found: {}", aggregate_id);
        }

        A::load_from_events(&events)
    }

    /// Take every pending outbox entry. Each envelope is handed out once.
    pub async fn drain_outbox(&self) -> Vec<EventEnvelope<E>> {
        let mut state = self.state.lock().await;
        state.outbox.drain(..).collect()
    }

    /// Put unpublished envelopes back at the head of the outbox, keeping
    /// their original order.
    pub async fn requeue(&self, envelopes: Vec<EventEnvelope<E>>) {
        let mut state = self.state.lock().await;
        for envelope in envelopes.into_iter().rev() {
            state.outbox.push_front(envelope);
        }
    }

    pub async fn outbox_len(&self) -> usize {
        self.state.lock().await.outbox.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Tick(u32);

    impl DomainEvent for Tick {
        fn event_type(&self) -> &'static str { "Tick" }
    }

    fn envelope(aggregate_id: Uuid, seq: i64, n: u32) -> EventEnvelope<Tick> {
        EventEnvelope::new(aggregate_id, seq, "Tick".to_string(), Tick(n), Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let log = EventLog::new("Test");
        let id = Uuid::new_v4();

        let v = log.append_events(id, 0, vec![envelope(id, 1, 1), envelope(id, 2, 2)]).await.unwrap();
        assert_eq!(v, 2);

        let v = log.append_events(id, 2, vec![envelope(id, 3, 3)]).await.unwrap();
        assert_eq!(v, 3);

        let events = log.load_events(id).await;
        let data: Vec<u32> = events.iter().map(|e| e.event_data.0).collect();
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(log.current_version(id).await, 3);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let log = EventLog::new("Test");
        let id = Uuid::new_v4();

        log.append_events(id, 0, vec![envelope(id, 1, 1)]).await.unwrap();
        let err = log.append_events(id, 0, vec![envelope(id, 1, 9)]).await.unwrap_err();

        assert!(err.to_string().contains("Concurrency conflict"));
        assert_eq!(log.current_version(id).await, 1);
        assert_eq!(log.outbox_len().await, 1);
    }

    #[tokio::test]
    async fn test_out_of_sequence_envelope_is_rejected() {
        let log = EventLog::new("Test");
        let id = Uuid::new_v4();

        assert!(log.append_events(id, 0, vec![envelope(id, 2, 1)]).await.is_err());
        assert!(log.append_events(id, 0, vec![]).await.is_err());
        assert_eq!(log.current_version(id).await, 0);
    }

    #[tokio::test]
    async fn test_drain_and_requeue_preserve_order() {
        let log = EventLog::new("Test");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        log.append_events(a, 0, vec![envelope(a, 1, 1)]).await.unwrap();
        log.append_events(b, 0, vec![envelope(b, 1, 2)]).await.unwrap();

        let drained = log.drain_outbox().await;
        assert_eq!(drained.len(), 2);
        assert!(log.drain_outbox().await.is_empty());

        log.append_events(a, 1, vec![envelope(a, 2, 3)]).await.unwrap();
        log.requeue(drained).await;

        let data: Vec<u32> = log.drain_outbox().await.iter().map(|e| e.event_data.0).collect();
        assert_eq!(data, vec![1, 2, 3]);
    }
}
