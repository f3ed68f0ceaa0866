//! `peerfund-infra` — storage and orchestration infrastructure.
//!
//! Nothing in here knows about HTTP. The event store and directory store are
//! trait boundaries with in-memory implementations; the document storage
//! engine behind them is an external collaborator reached only through these
//! find/update/append primitives.

pub mod command_dispatcher;
pub mod directory;
pub mod event_store;
pub mod mailer;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use directory::{DirectoryError, DirectoryStore, InMemoryDirectoryStore};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use mailer::{Mailer, MailerError, TracingMailer};
