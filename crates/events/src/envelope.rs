use serde::{Deserialize, Serialize};
use uuid::Uuid;

use peerfund_core::UserId;

/// Envelope for an event, carrying per-user stream metadata.
///
/// This is the unit published to the bus after an append succeeds.
///
/// Notes:
/// - Streams are keyed by the owning `user_id` (one ledger stream per user).
/// - **Append-only**: `sequence_number` is monotonically increasing per stream.
/// - `payload` is the domain-agnostic event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    user_id: UserId,
    stream_type: String,

    /// Monotonically increasing position in the user's stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        user_id: UserId,
        stream_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            user_id,
            stream_type: stream_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn stream_type(&self) -> &str {
        &self.stream_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
