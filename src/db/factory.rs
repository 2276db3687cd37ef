//! Catalog factory for dependency injection.
//!
//! Creates and configures catalog backends based on runtime configuration.

use std::str::FromStr;
use std::sync::Arc;

use super::repositories::LocalCatalog;
#[cfg(feature = "postgres-catalog")]
use super::repositories::PostgresCatalog;
use super::repository::{CatalogError, CatalogResult, FullCatalog};
use super::PostgresConfig;

/// Catalog backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogType {
    /// Postgres + Diesel implementation
    Postgres,
    /// In-memory local catalog
    Local,
}

impl FromStr for CatalogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown catalog type: {}", s)),
        }
    }
}

impl CatalogType {
    /// Get catalog type from the environment.
    ///
    /// Reads `CATALOG_TYPE`. Defaults to Postgres if a database URL is
    /// present, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("CATALOG_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

/// Factory for creating catalog instances.
pub struct CatalogFactory;

impl CatalogFactory {
    /// Create a catalog instance based on type.
    ///
    /// # Arguments
    /// * `catalog_type` - Backend to create
    /// * `postgres_config` - Database configuration (required for Postgres)
    ///
    /// # Returns
    /// * `Ok(Arc<dyn FullCatalog>)` - Boxed catalog instance
    /// * `Err(CatalogError)` - If creation fails
    pub async fn create(
        catalog_type: CatalogType,
        postgres_config: Option<&PostgresConfig>,
    ) -> CatalogResult<Arc<dyn FullCatalog>> {
        match catalog_type {
            CatalogType::Postgres => {
                #[cfg(feature = "postgres-catalog")]
                {
                    let config = postgres_config.ok_or_else(|| {
                        CatalogError::configuration(
                            "Postgres catalog requires PostgresConfig".to_string(),
                        )
                    })?;
                    let pg = Self::create_postgres(config).await?;
                    Ok(pg as Arc<dyn FullCatalog>)
                }
                #[cfg(not(feature = "postgres-catalog"))]
                {
                    let _ = postgres_config;
                    Err(CatalogError::configuration(
                        "Postgres catalog feature not enabled".to_string(),
                    ))
                }
            }
            CatalogType::Local => Ok(Self::create_local()),
        }
    }

    /// Create a Postgres catalog, running migrations during initialization.
    #[cfg(feature = "postgres-catalog")]
    pub async fn create_postgres(config: &PostgresConfig) -> CatalogResult<Arc<PostgresCatalog>> {
        let config = config.clone();
        let catalog = tokio::task::spawn_blocking(move || PostgresCatalog::new(config))
            .await
            .map_err(|e| CatalogError::internal(format!("Task join error: {}", e)))??;
        Ok(Arc::new(catalog))
    }

    /// Create an in-memory local catalog.
    pub fn create_local() -> Arc<dyn FullCatalog> {
        Arc::new(LocalCatalog::new())
    }
}
