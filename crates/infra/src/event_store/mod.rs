//! Append-only event store boundary.
//!
//! One stream per user; the store makes no assumptions about the backing
//! engine beyond ordered append and load.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
