//! # orbitcat
//!
//! Orbit overlap resolution engine for a polar-orbiter scan-line catalog.
//!
//! The catalog stores decades of satellite passes ("orbits"); chronologically
//! adjacent orbits of the same satellite overlap by a handful of seconds
//! because the ingestion pipeline producing each orbit is unaware of its
//! neighbors. This crate walks each satellite's time-ordered orbit sequence
//! and records, per orbit, the redundancy-free scan-line windows (begin-cut
//! and end-cut) plus the scan-line index where the orbit crosses UTC
//! midnight, so day-bucketed aggregation never double-counts or mis-buckets
//! scan lines.
//!
//! ## Architecture
//!
//! - [`models`]: domain types (satellites, orbit spans, cut windows)
//! - [`db`]: catalog access via the Repository pattern (Postgres + Diesel,
//!   or in-memory for tests and local development)
//! - [`services`]: the engine itself (midnight classifier, overlap
//!   arithmetic, pairwise resolver)
//!
//! The engine never interprets pixel data, never judges sensor quality, and
//! never decides catalog membership; it only computes and records windows
//! for orbits already present and not blacklisted.

pub mod db;
pub mod models;
pub mod services;

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};

use db::{CatalogFactory, CatalogType, FullCatalog};

/// Global catalog instance initialized once per process.
static CATALOG: OnceLock<Arc<dyn FullCatalog>> = OnceLock::new();

#[cfg(feature = "postgres-catalog")]
async fn create_selected_catalog(catalog_type: CatalogType) -> Result<Arc<dyn FullCatalog>> {
    match catalog_type {
        CatalogType::Postgres => {
            let config = db::PostgresConfig::from_env()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to read Postgres configuration")?;
            CatalogFactory::create(catalog_type, Some(&config))
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))
        }
        CatalogType::Local => Ok(CatalogFactory::create_local()),
    }
}

#[cfg(not(feature = "postgres-catalog"))]
async fn create_selected_catalog(catalog_type: CatalogType) -> Result<Arc<dyn FullCatalog>> {
    match catalog_type {
        CatalogType::Postgres => {
            anyhow::bail!("Postgres catalog selected but feature not enabled")
        }
        CatalogType::Local => Ok(CatalogFactory::create_local()),
    }
}

#[cfg(feature = "postgres-catalog")]
async fn create_from_config_file(path: &str) -> Result<Arc<dyn FullCatalog>> {
    let config = db::CatalogConfig::from_file(path).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let catalog_type = config
        .catalog_type()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    match catalog_type {
        CatalogType::Postgres => CatalogFactory::create(catalog_type, Some(&config.postgres_config()))
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string())),
        CatalogType::Local => Ok(CatalogFactory::create_local()),
    }
}

#[cfg(not(feature = "postgres-catalog"))]
async fn create_from_config_file(path: &str) -> Result<Arc<dyn FullCatalog>> {
    let config = db::CatalogConfig::from_file(path).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    match config
        .catalog_type()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
    {
        CatalogType::Postgres => {
            anyhow::bail!("Config file selects Postgres but feature not enabled")
        }
        CatalogType::Local => Ok(CatalogFactory::create_local()),
    }
}

/// Initialize the global catalog singleton.
///
/// Backend selection: a `CATALOG_CONFIG` TOML file if set, otherwise the
/// environment (`CATALOG_TYPE`, `DATABASE_URL`).
pub async fn init_catalog() -> Result<()> {
    if CATALOG.get().is_some() {
        return Ok(());
    }

    let catalog = if let Ok(path) = std::env::var("CATALOG_CONFIG") {
        create_from_config_file(&path).await?
    } else {
        create_selected_catalog(CatalogType::from_env()).await?
    };
    let _ = CATALOG.set(catalog);
    Ok(())
}

/// Get a reference to the global catalog instance.
pub fn get_catalog() -> Result<&'static Arc<dyn FullCatalog>> {
    CATALOG
        .get()
        .context("Catalog not initialized. Call init_catalog() first.")
}
