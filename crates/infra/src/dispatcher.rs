//! Command execution pipeline (application-level orchestration).
//!
//! Every engine operation follows the same lifecycle:
//!
//! ```text
//! 1. Load events from the store
//! 2. Rehydrate aggregate (apply history)
//! 3. Handle command (pure decision, produces events)
//! 4. Persist events (append-only, optimistic concurrency)
//! 5. Publish committed events to the bus
//! ```
//!
//! Cross-aggregate operations run steps 1-3 once per aggregate and commit all
//! staged events through a single `append_multi`, so either every aggregate
//! moves or none does. The helpers here are the shared pieces of that
//! pipeline; `BillingEngine` composes them.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use blockbill_core::{Aggregate, AggregateId, BillingError, ExpectedVersion};
use blockbill_events::EventBus;
use blockbill_events::EventEnvelope;

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Application-level failure of an engine operation.
///
/// Domain failures keep their `BillingError` kind; everything else is an
/// infrastructure concern.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Deterministic domain failure (validation, lifecycle, block rules).
    #[error(transparent)]
    Domain(#[from] BillingError),

    /// Optimistic concurrency failure; reload and retry.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// Historical event payload failed to deserialize.
    #[error("event deserialization failed: {0}")]
    Deserialize(String),

    /// Persisting to the event store failed.
    #[error("event store failure: {0}")]
    Store(EventStoreError),

    /// Publication failed after a successful append (at-least-once; the
    /// events are committed, retrying publication is safe).
    #[error("event publication failed after commit: {0}")]
    Publish(String),
}

impl From<EventStoreError> for EngineError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => EngineError::Concurrency(msg),
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    /// The domain error kind, if this is a domain failure.
    pub fn as_domain(&self) -> Option<&BillingError> {
        match self {
            EngineError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Load a stream and rebuild the aggregate's current state.
///
/// Returns the aggregate together with the expected version a subsequent
/// append must carry.
pub fn rehydrate<S, A>(
    store: &S,
    aggregate_type: &str,
    aggregate_id: AggregateId,
    make_aggregate: impl FnOnce(AggregateId) -> A,
) -> Result<(A, ExpectedVersion), EngineError>
where
    S: EventStore,
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    let history = store.load_stream(aggregate_type, aggregate_id)?;
    validate_loaded_stream(aggregate_id, &history)?;
    let expected = ExpectedVersion::Exact(stream_version(&history));

    let mut aggregate = make_aggregate(aggregate_id);
    for stored in &history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| EngineError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok((aggregate, expected))
}

/// Wrap decided domain events for persistence.
pub fn stage<E>(
    aggregate_id: AggregateId,
    aggregate_type: &str,
    events: &[E],
) -> Result<Vec<UncommittedEvent>, EngineError>
where
    E: blockbill_events::Event + Serialize,
{
    events
        .iter()
        .map(|ev| {
            UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev)
                .map_err(EngineError::from)
        })
        .collect()
}

/// Publish committed events to the bus (post-commit, at-least-once).
pub fn publish_all<B>(bus: &B, committed: &[StoredEvent]) -> Result<(), EngineError>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    for stored in committed {
        bus.publish(stored.to_envelope())
            .map_err(|e| EngineError::Publish(format!("{e:?}")))?;
    }
    Ok(())
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), EngineError> {
    // Ensure the stream belongs to the requested aggregate and is
    // monotonically increasing by sequence number, even if a buggy backend
    // returns something else.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(EngineError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(EngineError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}
