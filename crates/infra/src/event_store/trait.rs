use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use peerfund_core::{ExpectedVersion, UserId};

/// An event ready to be appended to a user's stream, not yet assigned a
/// sequence number (the store assigns those during append).
///
/// Build one with [`UncommittedEvent::from_typed`], which serializes the typed
/// domain event to JSON and captures the metadata needed to deserialize it
/// later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub user_id: UserId,
    pub stream_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A persisted event with its position in the user's stream.
///
/// Sequence numbers are per-stream, start at 1, and increase monotonically
/// with no gaps; they double as the optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub user_id: UserId,
    pub stream_type: String,

    /// Monotonically increasing position in the user's stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into an envelope for publication.
    pub fn to_envelope(&self) -> peerfund_events::EventEnvelope<JsonValue> {
        peerfund_events::EventEnvelope::new(
            self.event_id,
            self.user_id,
            self.stream_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// Event store operation error (infrastructure-level, not domain-level).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("stream isolation violation: {0}")]
    StreamIsolation(String),

    #[error("stream type mismatch: {0}")]
    StreamTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event publication failed: {0}")]
    Publish(String),
}

/// Append-only, per-user event store.
///
/// Implementations must:
/// - enforce that a batch targets exactly one user stream
/// - enforce optimistic concurrency against the current stream version
/// - assign monotonically increasing `sequence_number`s (no gaps, no dupes)
/// - persist a batch atomically (all events or none)
pub trait EventStore: Send + Sync {
    /// Append events to a user's stream (append-only).
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream for a user, in sequence order. Empty when the
    /// stream does not exist.
    fn load_stream(&self, user_id: UserId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Drop a user's stream entirely (account-deletion support).
    ///
    /// The one concession to append-only: when an account is deleted, its
    /// ledger history goes with it, and later loads see an empty stream.
    fn purge_stream(&self, user_id: UserId) -> Result<(), EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, user_id: UserId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(user_id)
    }

    fn purge_stream(&self, user_id: UserId) -> Result<(), EventStoreError> {
        (**self).purge_stream(user_id)
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    ///
    /// Keeps infra decoupled from the domain while still capturing the event
    /// metadata needed for future deserialization.
    pub fn from_typed<E>(
        user_id: UserId,
        stream_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: peerfund_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            user_id,
            stream_type: stream_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
