use std::collections::HashMap;
use std::sync::RwLock;

use peerfund_core::{ExpectedVersion, UserId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// In-memory append-only event store.
///
/// The whole append (version check + sequence assignment + push) runs under
/// one write lock, which is what serializes racing writers per user.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<UserId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        // All events must target the same user stream.
        let user_id = events[0].user_id;
        let stream_type = events[0].stream_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.user_id != user_id {
                return Err(EventStoreError::StreamIsolation(format!(
                    "batch contains multiple user_ids (index {idx})"
                )));
            }
            if e.stream_type != stream_type {
                return Err(EventStoreError::StreamTypeMismatch(format!(
                    "batch contains multiple stream_types (index {idx})"
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        let stream = streams.entry(user_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Enforce stream type stability across the stream.
        if let Some(existing) = stream.first() {
            if existing.stream_type != stream_type {
                return Err(EventStoreError::StreamTypeMismatch(format!(
                    "stream type is '{}', attempted append with '{}'",
                    existing.stream_type, stream_type
                )));
            }
        }

        // Assign sequence numbers and append (append-only).
        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                user_id: e.user_id,
                stream_type: e.stream_type,
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

        Ok(committed)
    }

    fn load_stream(&self, user_id: UserId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&user_id).cloned().unwrap_or_default())
    }

    fn purge_stream(&self, user_id: UserId) -> Result<(), EventStoreError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        streams.remove(&user_id);
        Ok(())
    }
}
