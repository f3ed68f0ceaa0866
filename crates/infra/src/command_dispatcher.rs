//! Command execution pipeline (application-level orchestration).
//!
//! Every mutation of a user's ledger goes through the same pipeline:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the user's stream from the store
//!   ↓
//! 2. Rehydrate the aggregate (apply historical events)
//!   ↓
//! 3. Handle the command (pure decision logic, produces events)
//!   ↓
//! 4. Append to the store (optimistic concurrency check)
//!   ↓
//! 5. Publish committed events to the bus
//! ```
//!
//! The optimistic check in step 4 is what serializes concurrent writers per
//! user: both load at version `v`, both expect `Exact(v)` on append, only one
//! append succeeds, the other surfaces as a conflict for the caller to retry
//! or report. Publication happens only after a successful append; if it fails
//! the events are already durable and retrying is idempotent (at-least-once).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use peerfund_core::{Aggregate, DomainError, ExpectedVersion, UserId};
use peerfund_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure (e.g. stale stream version).
    Concurrency(String),
    /// Stream isolation violation (cross-user stream mixing).
    StreamIsolation(String),
    /// Domain validation failure (deterministic).
    Validation(String),
    /// Domain business-rule failure (deterministic).
    RuleViolation(String),
    /// Domain authorization failure.
    Unauthorized,
    /// Domain-level not found.
    NotFound(String),
    /// Failed to deserialize historical event payloads into the aggregate
    /// event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may
    /// duplicate).
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            EventStoreError::StreamIsolation(msg) => DispatchError::StreamIsolation(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::RuleViolation(msg) => DispatchError::RuleViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound(msg) => DispatchError::NotFound(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for the per-user aggregates.
///
/// Generic over the store and bus so tests run against the in-memory
/// implementations and a persistent backend can be swapped in without
/// touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command against one user's stream.
    ///
    /// Returns the committed events (with assigned sequence numbers); an
    /// empty vec means the command decided nothing needed to happen.
    pub fn dispatch<A>(
        &self,
        user_id: UserId,
        stream_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(UserId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: peerfund_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history for this user
        let history = self.store.load_stream(user_id)?;
        validate_loaded_stream(user_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(user_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let stream_type = stream_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(user_id, stream_type.clone(), Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // 5) Publish committed events (after append)
        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(user_id: UserId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    // Enforce stream isolation even if a buggy backend returns another user's
    // events, and ensure the stream is monotonically increasing.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.user_id != user_id {
            return Err(DispatchError::StreamIsolation(format!(
                "loaded stream contains wrong user_id at index {idx}"
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
