//! Abstract catalog interface (Repository pattern).
//!
//! The resolution engine only ever talks to the orbit catalog through these
//! traits, so storage backends can be swapped without touching the engine.

mod error;

pub use error::{CatalogError, CatalogResult, ErrorContext};

use async_trait::async_trait;

use crate::models::{CutWindow, OrbitKey, OrbitSpan, Satellite};

/// Read side of the orbit catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Check that the store is reachable.
    async fn health_check(&self) -> CatalogResult<bool>;

    /// Fetch the eligible (non-blacklisted) orbits of one satellite,
    /// ascending by start time. An empty vector means nothing to resolve
    /// and is not an error.
    async fn fetch_orbits(&self, satellite: Satellite) -> CatalogResult<Vec<OrbitSpan>>;
}

/// Write side of the orbit catalog.
///
/// Both window writes are idempotent overwrites addressed by the orbit's
/// natural key; full satellite re-runs after catalog corrections are
/// routine. A key that does not resolve to exactly one record yields
/// [`CatalogError::Conflict`] (more than one match) or
/// [`CatalogError::NotFound`] (no match).
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Persist the begin-cut window of one orbit.
    async fn write_begin_cut(&self, key: &OrbitKey, window: CutWindow) -> CatalogResult<()>;

    /// Persist the end-cut window together with the midnight scanline.
    /// The store models these as a single end-of-orbit record, so they are
    /// written as one joint update.
    async fn write_end_cut(
        &self,
        key: &OrbitKey,
        window: CutWindow,
        midnight_scanline: Option<i32>,
    ) -> CatalogResult<()>;

    /// Take the exclusive per-satellite run lock. A reader observing a
    /// half-written set of cut windows would see an inconsistent overlap
    /// picture, so the lock is held for the whole scan.
    async fn begin_run(&self, satellite: Satellite) -> CatalogResult<()>;

    /// Release the per-satellite run lock.
    async fn finish_run(&self, satellite: Satellite) -> CatalogResult<()>;
}

/// Combined interface required by the resolution engine.
pub trait FullCatalog: CatalogReader + CatalogWriter {}

impl<T: CatalogReader + CatalogWriter> FullCatalog for T {}
