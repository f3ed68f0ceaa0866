//! Account directory storage boundary.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDirectoryStore;
pub use r#trait::{DirectoryError, DirectoryStore, ResetToken};
