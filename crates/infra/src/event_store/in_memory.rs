use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use blockbill_core::AggregateId;

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    aggregate_type: String,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. A single write lock covers the whole commit, so
/// each `append_multi` is serializable with respect to every stream it
/// touches.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    /// Validate that one append targets exactly one stream and return its key.
    fn stream_key(events: &[UncommittedEvent]) -> Result<StreamKey, EventStoreError> {
        let aggregate_id = events[0].aggregate_id;
        let aggregate_type = events[0].aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        Ok(StreamKey {
            aggregate_type,
            aggregate_id,
        })
    }
}

impl EventStore for InMemoryEventStore {
    fn append_multi(&self, appends: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        let appends: Vec<StreamAppend> = appends
            .into_iter()
            .filter(|a| !a.events.is_empty())
            .collect();
        if appends.is_empty() {
            return Ok(vec![]);
        }

        // Validate shape and de-duplicate stream targets before locking.
        let mut keys = Vec::with_capacity(appends.len());
        let mut seen = HashSet::new();
        for append in &appends {
            let key = Self::stream_key(&append.events)?;
            if !seen.insert(key.clone()) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "commit targets stream '{}/{}' twice",
                    key.aggregate_type, key.aggregate_id
                )));
            }
            keys.push(key);
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        // Phase 1: check every stream's expected version. Nothing is written
        // until all checks pass, which makes the commit all-or-nothing.
        for (key, append) in keys.iter().zip(&appends) {
            let current = streams
                .get(key)
                .map(|s| Self::current_version(s))
                .unwrap_or(0);
            if !append.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream '{}/{}': expected {:?}, found {current}",
                    key.aggregate_type, key.aggregate_id, append.expected_version
                )));
            }
        }

        // Phase 2: assign sequence numbers and append.
        let mut committed = Vec::new();
        for (key, append) in keys.into_iter().zip(appends) {
            let stream = streams.entry(key).or_default();
            let mut next = Self::current_version(stream) + 1;
            for e in append.events {
                let stored = StoredEvent {
                    event_id: e.event_id,
                    aggregate_id: e.aggregate_id,
                    aggregate_type: e.aggregate_type,
                    sequence_number: next,
                    event_type: e.event_type,
                    event_version: e.event_version,
                    occurred_at: e.occurred_at,
                    payload: e.payload,
                };
                next += 1;
                stream.push(stored.clone());
                committed.push(stored);
            }
        }

        Ok(committed)
    }

    fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockbill_core::ExpectedVersion;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn event(aggregate_id: AggregateId, aggregate_type: &str, n: u64) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.event".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "n": n }),
        }
    }

    #[test]
    fn append_assigns_monotonic_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let first = store
            .append(
                vec![event(id, "t", 1), event(id, "t", 2)],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
        assert_eq!(first[0].sequence_number, 1);
        assert_eq!(first[1].sequence_number, 2);

        let second = store
            .append(vec![event(id, "t", 3)], ExpectedVersion::Exact(2))
            .unwrap();
        assert_eq!(second[0].sequence_number, 3);

        let loaded = store.load_stream("t", id).unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn stale_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(vec![event(id, "t", 1)], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![event(id, "t", 2)], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream("t", id).unwrap().len(), 1);
    }

    #[test]
    fn multi_stream_commit_is_all_or_nothing() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        store
            .append(vec![event(b, "t", 1)], ExpectedVersion::Exact(0))
            .unwrap();

        // Stream b's expected version is stale, so stream a must not move.
        let err = store
            .append_multi(vec![
                StreamAppend::new(vec![event(a, "t", 1)], ExpectedVersion::Exact(0)),
                StreamAppend::new(vec![event(b, "t", 2)], ExpectedVersion::Exact(0)),
            ])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert!(store.load_stream("t", a).unwrap().is_empty());
        assert_eq!(store.load_stream("t", b).unwrap().len(), 1);

        let committed = store
            .append_multi(vec![
                StreamAppend::new(vec![event(a, "t", 1)], ExpectedVersion::Exact(0)),
                StreamAppend::new(vec![event(b, "t", 2)], ExpectedVersion::Exact(1)),
            ])
            .unwrap();
        assert_eq!(committed.len(), 2);
    }

    #[test]
    fn streams_are_scoped_by_aggregate_type() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(vec![event(id, "accounts.account", 1)], ExpectedVersion::Exact(0))
            .unwrap();
        store
            .append(vec![event(id, "credits.pool", 1)], ExpectedVersion::Exact(0))
            .unwrap();

        assert_eq!(store.load_stream("accounts.account", id).unwrap().len(), 1);
        assert_eq!(store.load_stream("credits.pool", id).unwrap().len(), 1);
    }

    #[test]
    fn commit_refuses_the_same_stream_twice() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let err = store
            .append_multi(vec![
                StreamAppend::new(vec![event(id, "t", 1)], ExpectedVersion::Exact(0)),
                StreamAppend::new(vec![event(id, "t", 2)], ExpectedVersion::Exact(0)),
            ])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
        assert!(store.load_stream("t", id).unwrap().is_empty());
    }

    #[test]
    fn mixed_aggregate_ids_in_one_batch_are_rejected() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let err = store
            .append(
                vec![event(a, "t", 1), event(b, "t", 2)],
                ExpectedVersion::Exact(0),
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
    }
}
