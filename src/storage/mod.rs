//! Storage backends for the search index.
//!
//! [`traits::IndexStore`] is the persistence boundary: upsert/delete/exists
//! by id plus the filtered, ranked, paginated read. [`sql::PgIndexStore`]
//! is the production backend (Postgres full-text + array overlap);
//! [`memory::InMemoryIndexStore`] carries the same query contract in
//! process for tests and local runs.

pub mod memory;
pub mod sql;
pub mod traits;

pub use memory::InMemoryIndexStore;
pub use sql::PgIndexStore;
pub use traits::{IndexStore, SearchPage, StorageError};
