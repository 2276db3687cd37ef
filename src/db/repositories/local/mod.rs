//! In-memory catalog implementation for unit testing and local development.
//!
//! Mirrors the semantics of the Postgres backend: orbits are keyed by their
//! natural key, blacklisted orbits are invisible to the Reader, window
//! writes are idempotent overwrites, and the per-satellite run lock is
//! exclusive for the duration of a scan.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::db::repository::{
    CatalogError, CatalogReader, CatalogResult, CatalogWriter, ErrorContext,
};
use crate::models::{CutWindow, OrbitKey, OrbitResolution, OrbitSpan, Satellite};

#[derive(Debug, Clone)]
struct OrbitRow {
    span: OrbitSpan,
    blacklisted: bool,
    begin_cut: Option<CutWindow>,
    end_cut: Option<CutWindow>,
    midnight_scanline: Option<i32>,
}

/// In-memory orbit catalog.
#[derive(Default)]
pub struct LocalCatalog {
    orbits: RwLock<HashMap<Satellite, Vec<OrbitRow>>>,
    active_runs: Mutex<HashSet<Satellite>>,
}

impl LocalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an eligible orbit, as the ingestion pipeline would.
    pub fn insert_orbit(&self, span: OrbitSpan) {
        self.insert_row(span, false);
    }

    /// Insert a blacklisted orbit; it will never be visible to the Reader.
    pub fn insert_blacklisted(&self, span: OrbitSpan) {
        self.insert_row(span, true);
    }

    fn insert_row(&self, span: OrbitSpan, blacklisted: bool) {
        let mut orbits = self.orbits.write();
        orbits.entry(span.satellite).or_default().push(OrbitRow {
            span,
            blacklisted,
            begin_cut: None,
            end_cut: None,
            midnight_scanline: None,
        });
    }

    /// Derived fields of one orbit, if every field has been written.
    /// Test helper mirroring what a downstream day-bucketing reader sees.
    pub fn resolution(&self, key: &OrbitKey) -> Option<OrbitResolution> {
        let orbits = self.orbits.read();
        let rows = orbits.get(&key.satellite)?;
        let row = rows.iter().find(|r| row_matches(r, key))?;
        Some(OrbitResolution {
            begin_cut: row.begin_cut?,
            end_cut: row.end_cut?,
            midnight_scanline: row.midnight_scanline,
        })
    }

    /// Begin-cut window of one orbit, if written.
    pub fn begin_cut(&self, key: &OrbitKey) -> Option<CutWindow> {
        let orbits = self.orbits.read();
        orbits
            .get(&key.satellite)?
            .iter()
            .find(|r| row_matches(r, key))?
            .begin_cut
    }

    /// End-cut window of one orbit, if written.
    pub fn end_cut(&self, key: &OrbitKey) -> Option<CutWindow> {
        let orbits = self.orbits.read();
        orbits
            .get(&key.satellite)?
            .iter()
            .find(|r| row_matches(r, key))?
            .end_cut
    }

    fn with_unique_row<F>(&self, key: &OrbitKey, operation: &str, f: F) -> CatalogResult<()>
    where
        F: FnOnce(&mut OrbitRow),
    {
        let mut orbits = self.orbits.write();
        let rows = orbits.entry(key.satellite).or_default();
        let mut matches: Vec<&mut OrbitRow> =
            rows.iter_mut().filter(|r| row_matches(r, key)).collect();
        match matches.len() {
            1 => {
                f(matches.remove(0));
                Ok(())
            }
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

fn row_matches(row: &OrbitRow, key: &OrbitKey) -> bool {
    row.span.start_time == key.start_time && row.span.end_time == key.end_time
}

#[async_trait]
impl CatalogReader for LocalCatalog {
    async fn health_check(&self) -> CatalogResult<bool> {
        Ok(true)
    }

    async fn fetch_orbits(&self, satellite: Satellite) -> CatalogResult<Vec<OrbitSpan>> {
        let orbits = self.orbits.read();
        let mut spans: Vec<OrbitSpan> = orbits
            .get(&satellite)
            .map(|rows| {
                rows.iter()
                    .filter(|r| !r.blacklisted)
                    .map(|r| r.span)
                    .collect()
            })
            .unwrap_or_default();
        spans.sort_by_key(|s| s.start_time);
        Ok(spans)
    }
}

#[async_trait]
impl CatalogWriter for LocalCatalog {
    async fn write_begin_cut(&self, key: &OrbitKey, window: CutWindow) -> CatalogResult<()> {
        self.with_unique_row(key, "write_begin_cut", |row| {
            row.begin_cut = Some(window);
        })
    }

    async fn write_end_cut(
        &self,
        key: &OrbitKey,
        window: CutWindow,
        midnight_scanline: Option<i32>,
    ) -> CatalogResult<()> {
        self.with_unique_row(key, "write_end_cut", |row| {
            row.end_cut = Some(window);
            row.midnight_scanline = midnight_scanline;
        })
    }

    async fn begin_run(&self, satellite: Satellite) -> CatalogResult<()> {
        let mut runs = self.active_runs.lock();
        if !runs.insert(satellite) {
            return Err(CatalogError::conflict_with_context(
                "Resolution run already active for satellite",
                ErrorContext::new("begin_run").with_entity_id(satellite),
            ));
        }
        Ok(())
    }

    async fn finish_run(&self, satellite: Satellite) -> CatalogResult<()> {
        self.active_runs.lock().remove(&satellite);
        Ok(())
    }
}
