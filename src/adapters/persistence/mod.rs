//! DocumentStore implementations kept on this machine.

pub mod memory_store;
pub mod seed;
pub mod sqlite_store;

pub use memory_store::InMemoryDocumentStore;
pub use seed::{import_seed, import_seed_file, parse_seed};
pub use sqlite_store::SqliteDocumentStore;
