//! Postgres catalog implementation using Diesel.
//!
//! Implements the catalog Reader/Writer traits against the `orbits` table.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//! - Per-satellite advisory run locks
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sql_query;
use diesel::sql_types::BigInt;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    CatalogError, CatalogReader, CatalogResult, CatalogWriter, ErrorContext,
};
use crate::models::{CutWindow, OrbitKey, OrbitSpan, Satellite};

mod models;
mod schema;

use models::{NewOrbitRow, OrbitRow};
use schema::orbits;

type PgPool = Pool<ConnectionManager<PgConnection>>;
type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Namespace for per-satellite advisory lock keys, so the engine's locks
/// cannot collide with other advisory-lock users of the same database.
const RUN_LOCK_NAMESPACE: i64 = 0x6f72_6263_6174; // "orbcat"

fn run_lock_key(satellite: Satellite) -> i64 {
    let index = Satellite::ALL
        .iter()
        .position(|s| *s == satellite)
        .unwrap_or(Satellite::ALL.len()) as i64;
    (RUN_LOCK_NAMESPACE << 8) | index
}

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed orbit catalog for Postgres.
pub struct PostgresCatalog {
    pool: PgPool,
    config: PostgresConfig,
    // Connections holding a pg_advisory_lock must release it on the same
    // session, so each active run pins its own pooled connection here.
    run_locks: parking_lot::Mutex<HashMap<Satellite, PgPooledConnection>>,
    // Metrics counters
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresCatalog {
    /// Create a new catalog handle and run pending migrations.
    pub fn new(config: PostgresConfig) -> CatalogResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                CatalogError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                CatalogError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            run_locks: parking_lot::Mutex::new(HashMap::new()),
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> CatalogResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            CatalogError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient
    /// failures (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> CatalogResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = CatalogError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                CatalogError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            CatalogError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Insert an orbit record, as the ingestion pipeline does. The engine
    /// itself never inserts; this is the catalog-side half of the ingestion
    /// contract and is used when seeding test databases.
    pub async fn insert_orbit(&self, span: OrbitSpan, blacklisted: bool) -> CatalogResult<()> {
        self.with_conn(move |conn| {
            let row = NewOrbitRow {
                satellite: span.satellite.as_str().to_string(),
                start_time: span.start_time,
                end_time: span.end_time,
                along_track_length: span.along_track_length,
                blacklisted,
            };
            diesel::insert_into(orbits::table)
                .values(&row)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await
    }

    /// Interpret the affected-row count of a natural-key update.
    fn check_unique_update(
        affected: usize,
        operation: &str,
        key: &OrbitKey,
    ) -> CatalogResult<()> {
        match affected {
            1 => Ok(()),
            0 => Err(CatalogError::not_found_with_context(
                "Orbit key matched no record",
                ErrorContext::new(operation).with_entity_id(key),
            )),
            n => Err(CatalogError::conflict_with_context(
                format!("Orbit key matched {} records", n),
                ErrorContext::new(operation).with_entity_id(key),
            )),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> CatalogError {
    CatalogError::from(err)
}

#[async_trait]
impl CatalogReader for PostgresCatalog {
    async fn health_check(&self) -> CatalogResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn fetch_orbits(&self, satellite: Satellite) -> CatalogResult<Vec<OrbitSpan>> {
        self.with_conn(move |conn| {
            let rows = orbits::table
                .filter(orbits::satellite.eq(satellite.as_str()))
                .filter(orbits::blacklisted.eq(false))
                .order(orbits::start_time.asc())
                .select(OrbitRow::as_select())
                .load::<OrbitRow>(conn)
                .map_err(map_diesel_error)?;

            Ok(rows
                .into_iter()
                .map(|row| OrbitSpan {
                    satellite,
                    start_time: row.start_time,
                    end_time: row.end_time,
                    along_track_length: row.along_track_length,
                })
                .collect())
        })
        .await
    }
}

#[async_trait]
impl CatalogWriter for PostgresCatalog {
    async fn write_begin_cut(&self, key: &OrbitKey, window: CutWindow) -> CatalogResult<()> {
        let key = *key;
        self.with_conn(move |conn| {
            let affected = diesel::update(
                orbits::table
                    .filter(orbits::satellite.eq(key.satellite.as_str()))
                    .filter(orbits::start_time.eq(key.start_time))
                    .filter(orbits::end_time.eq(key.end_time)),
            )
            .set((
                orbits::begin_cut_start.eq(Some(window.start)),
                orbits::begin_cut_end.eq(Some(window.end)),
            ))
            .execute(conn)
            .map_err(map_diesel_error)?;

            Self::check_unique_update(affected, "write_begin_cut", &key)
        })
        .await
    }

    async fn write_end_cut(
        &self,
        key: &OrbitKey,
        window: CutWindow,
        midnight_scanline: Option<i32>,
    ) -> CatalogResult<()> {
        let key = *key;
        self.with_conn(move |conn| {
            let affected = diesel::update(
                orbits::table
                    .filter(orbits::satellite.eq(key.satellite.as_str()))
                    .filter(orbits::start_time.eq(key.start_time))
                    .filter(orbits::end_time.eq(key.end_time)),
            )
            .set((
                orbits::end_cut_start.eq(Some(window.start)),
                orbits::end_cut_end.eq(Some(window.end)),
                orbits::midnight_scanline.eq(midnight_scanline),
            ))
            .execute(conn)
            .map_err(map_diesel_error)?;

            Self::check_unique_update(affected, "write_end_cut", &key)
        })
        .await
    }

    async fn begin_run(&self, satellite: Satellite) -> CatalogResult<()> {
        if self.run_locks.lock().contains_key(&satellite) {
            return Err(CatalogError::conflict_with_context(
                "Resolution run already active for satellite",
                ErrorContext::new("begin_run").with_entity_id(satellite),
            ));
        }

        let pool = self.pool.clone();
        let lock_key = run_lock_key(satellite);
        let conn = task::spawn_blocking(move || -> CatalogResult<PgPooledConnection> {
            let mut conn = pool.get().map_err(|e| {
                CatalogError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("begin_run").retryable(),
                )
            })?;
            sql_query("SELECT pg_advisory_lock($1)")
                .bind::<BigInt, _>(lock_key)
                .execute(&mut conn)
                .map_err(map_diesel_error)?;
            Ok(conn)
        })
        .await
        .map_err(|e| {
            CatalogError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("begin_run"),
            )
        })??;

        self.run_locks.lock().insert(satellite, conn);
        Ok(())
    }

    async fn finish_run(&self, satellite: Satellite) -> CatalogResult<()> {
        let conn = self.run_locks.lock().remove(&satellite);
        let Some(mut conn) = conn else {
            return Ok(());
        };

        let lock_key = run_lock_key(satellite);
        task::spawn_blocking(move || -> CatalogResult<()> {
            if let Err(e) = sql_query("SELECT pg_advisory_unlock($1)")
                .bind::<BigInt, _>(lock_key)
                .execute(&mut conn)
            {
                // The connection must not return to the pool while the
                // session still holds the advisory lock, or the next
                // begin_run for this satellite blocks forever. Drop every
                // lock the session holds; if the session itself died, the
                // server has already released them and r2d2 discards the
                // broken connection.
                sql_query("SELECT pg_advisory_unlock_all()")
                    .execute(&mut conn)
                    .map_err(map_diesel_error)?;
                return Err(map_diesel_error(e));
            }
            Ok(())
        })
        .await
        .map_err(|e| {
            CatalogError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("finish_run"),
            )
        })?
    }
}
