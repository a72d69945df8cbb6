use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blockbill_core::AggregateId;

/// A committed event together with its stream coordinates.
///
/// This is what the bus delivers after a successful commit. The metadata is
/// enough for a consumer to filter (by `event_type` or `aggregate_type`) and
/// to detect gaps or replays (by `sequence_number`) without touching the
/// payload; the payload itself stays opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    aggregate_id: AggregateId,
    aggregate_type: String,

    /// Position within the aggregate's stream, assigned by the store.
    /// Monotonically increasing, never reused.
    sequence_number: u64,

    /// Dotted event name, e.g. "invoicing.invoice.payment_applied".
    event_type: String,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        event_type: impl Into<String>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            event_type: event_type.into(),
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
