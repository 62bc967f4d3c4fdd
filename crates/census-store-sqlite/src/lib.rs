//! SQLite backend for the census ETL pipeline.
//!
//! Owns a single blocking [`rusqlite::Connection`]. Loading is strictly
//! sequential: one writer, one in-flight batch.

mod load;
mod resolve;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
pub use store::SqliteStore;
