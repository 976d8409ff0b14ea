//! SQLite backend for the PCR review store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. The compare-and-swap
//! status update and the transactional line-item reconciliation both
//! live here, behind [`pcr_core::store::ReviewStore`].

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
