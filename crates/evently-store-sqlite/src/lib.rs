//! SQLite backend for the Evently document store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Live queries are served in-process:
//! every committed write wakes the listeners of its collection, which re-run
//! their filter and push a fresh snapshot.

mod encode;
mod live;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use live::LiveQuery;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
