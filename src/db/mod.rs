//! Orbit catalog access layer.
//!
//! The catalog is an external collaborator; this module provides the
//! Repository-pattern abstractions through which the resolution engine
//! reads orbit sequences and writes derived cut windows:
//!
//! - `repository`: `CatalogReader`/`CatalogWriter` trait definitions
//! - `repositories::postgres`: Postgres implementation with Diesel ORM
//! - `repositories::local`: In-memory implementation for unit testing and
//!   local development
//! - `factory`: Factory for creating catalog instances
//! - `repo_config`: TOML configuration file support

#[cfg(not(any(feature = "postgres-catalog", feature = "local-catalog")))]
compile_error!("Enable at least one catalog backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the catalog implementation.
#[cfg(feature = "postgres-catalog")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-catalog"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-catalog"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use factory::{CatalogFactory, CatalogType};
pub use repo_config::CatalogConfig;
pub use repositories::LocalCatalog;
#[cfg(feature = "postgres-catalog")]
pub use repositories::PostgresCatalog;
pub use repository::{
    CatalogError, CatalogReader, CatalogResult, CatalogWriter, ErrorContext, FullCatalog,
};
