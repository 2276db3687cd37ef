//! Catalog backend implementations.
//!
//! - `postgres`: PostgreSQL implementation with Diesel ORM
//! - `local`: In-memory implementation for unit testing and local development
pub mod local;
#[cfg(feature = "postgres-catalog")]
pub mod postgres;

pub use local::LocalCatalog;
#[cfg(feature = "postgres-catalog")]
pub use postgres::{PoolStats, PostgresCatalog, PostgresConfig};
