//! Infrastructure layer - Storage adapters

pub mod memory_store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory_store::{InMemorySectionStore, InMemoryTransaction};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteOptions, SqliteSectionStore, SqliteTransaction};
