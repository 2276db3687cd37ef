//! Overlap resolver.
//!
//! Walks one satellite's time-ordered orbit sequence pairwise and records,
//! for every orbit, the redundancy-free begin-cut and end-cut windows plus
//! the midnight scanline. Writes happen as the scan advances: each orbit's
//! begin-cut as soon as its predecessor pairing is decided, each orbit's
//! end-cut jointly with its midnight scanline as one end-of-orbit update.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::db::repository::{
    CatalogError, CatalogReader, CatalogResult, CatalogWriter, FullCatalog,
};
use crate::models::{CutWindow, OrbitKey, OrbitSpan, Satellite};

use super::{midnight, overlap};

/// Outcome of one satellite's resolution run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub satellite: Satellite,
    /// Eligible orbits seen by the scan.
    pub orbit_count: usize,
    /// Orbits whose end-of-orbit record was successfully written.
    pub orbits_updated: usize,
    /// Windows flagged as degenerate (empty or negative length).
    pub degenerate_windows: usize,
    /// Writes rejected because the orbit key did not uniquely resolve.
    pub conflicts: usize,
    /// Set when the run aborted entirely (store unavailable, lock held).
    pub fatal: Option<String>,
}

impl RunSummary {
    fn new(satellite: Satellite) -> Self {
        Self {
            satellite,
            orbit_count: 0,
            orbits_updated: 0,
            degenerate_windows: 0,
            conflicts: 0,
            fatal: None,
        }
    }

    /// A run that never produced a scan, e.g. because the store was down.
    pub fn failed(satellite: Satellite, reason: impl Into<String>) -> Self {
        Self {
            fatal: Some(reason.into()),
            ..Self::new(satellite)
        }
    }

    /// Whether this satellite's run must be reported as failed.
    pub fn is_failed(&self) -> bool {
        self.fatal.is_some() || self.degenerate_windows > 0 || self.conflicts > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref reason) = self.fatal {
            return write!(f, "{}: failed ({})", self.satellite, reason);
        }
        write!(
            f,
            "{}: {} orbits, {} updated, {} degenerate, {} conflicts",
            self.satellite,
            self.orbit_count,
            self.orbits_updated,
            self.degenerate_windows,
            self.conflicts
        )
    }
}

/// Aggregated outcome of a multi-satellite run.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub summaries: Vec<RunSummary>,
}

impl RunReport {
    pub fn is_failed(&self) -> bool {
        self.summaries.iter().any(|s| s.is_failed())
    }
}

/// Resolve the overlap windows of one satellite's orbit sequence.
///
/// Takes the exclusive per-satellite run lock for the duration of the scan.
/// Per-orbit data-quality failures (degenerate windows, key conflicts) are
/// recorded in the summary and the scan continues; an unreachable store
/// aborts the run.
pub async fn resolve_satellite(
    catalog: &dyn FullCatalog,
    satellite: Satellite,
) -> Result<RunSummary, CatalogError> {
    catalog.begin_run(satellite).await?;
    let outcome = scan(catalog, satellite).await;
    if let Err(e) = catalog.finish_run(satellite).await {
        warn!(satellite = %satellite, error = %e, "failed to release run lock");
    }
    outcome
}

/// Resolve several satellites concurrently, one task per satellite.
///
/// Satellites are fully independent; each scan owns its own cursor and run
/// lock. A satellite whose run aborts is reported as failed without
/// affecting the others.
pub async fn resolve_all(
    catalog: Arc<dyn FullCatalog>,
    satellites: &[Satellite],
) -> RunReport {
    let mut handles = Vec::with_capacity(satellites.len());
    for &satellite in satellites {
        let catalog = Arc::clone(&catalog);
        handles.push((
            satellite,
            tokio::spawn(async move { resolve_satellite(catalog.as_ref(), satellite).await }),
        ));
    }

    let mut report = RunReport::default();
    for (satellite, handle) in handles {
        let summary = match handle.await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                error!(satellite = %satellite, error = %e, "resolution run aborted");
                RunSummary::failed(satellite, e.to_string())
            }
            Err(e) => RunSummary::failed(satellite, format!("task panicked: {}", e)),
        };
        report.summaries.push(summary);
    }
    report
}

async fn scan(
    catalog: &dyn FullCatalog,
    satellite: Satellite,
) -> Result<RunSummary, CatalogError> {
    let mut summary = RunSummary::new(satellite);

    let orbits = catalog.fetch_orbits(satellite).await?;
    if orbits.is_empty() {
        info!(satellite = %satellite, "no eligible orbits, nothing to resolve");
        return Ok(summary);
    }
    summary.orbit_count = orbits.len();
    info!(satellite = %satellite, orbits = orbits.len(), "starting overlap resolution");

    // Midnight classification is independent of the overlap outcome and
    // happens once per orbit.
    let midnights: Vec<Option<i32>> = orbits.iter().map(midnight::classify).collect();

    // The first orbit has no predecessor: full begin-cut, written now.
    let first = &orbits[0];
    write_begin(
        catalog,
        &mut summary,
        &first.key(),
        CutWindow::full(first.along_track_length),
    )
    .await?;

    for (i, pair) in orbits.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        let (next_begin, current_end) = pair_windows(current, next);

        write_begin(catalog, &mut summary, &next.key(), next_begin).await?;
        write_end(catalog, &mut summary, &current.key(), current_end, midnights[i]).await?;
    }

    // The last orbit is never a pair's `current`: its end-of-orbit record
    // carries a full end-cut.
    let last = &orbits[orbits.len() - 1];
    write_end(
        catalog,
        &mut summary,
        &last.key(),
        CutWindow::full(last.along_track_length),
        midnights[orbits.len() - 1],
    )
    .await?;

    info!(satellite = %satellite, "{}", summary);
    Ok(summary)
}

/// Windows induced by one adjacent pair: the later orbit's begin-cut and
/// the earlier orbit's end-cut.
fn pair_windows(current: &OrbitSpan, next: &OrbitSpan) -> (CutWindow, CutWindow) {
    if current.end_time < next.start_time {
        // Gapped pair: both windows stay full. A touching pair falls
        // through below with a zero-length span and zero redundant lines.
        return (
            CutWindow::full(next.along_track_length),
            CutWindow::full(current.along_track_length),
        );
    }

    let redundant = overlap::overlap_scanlines(current, next);
    debug!(
        current = %current.key(),
        next = %next.key(),
        overlap_ms = (current.end_time - next.start_time).num_milliseconds(),
        redundant_lines = redundant,
        "overlapping pair"
    );
    (
        CutWindow::new(redundant, next.along_track_length),
        CutWindow::new(0, current.along_track_length - redundant),
    )
}

fn report_degenerate(summary: &mut RunSummary, key: &OrbitKey, which: &str, window: CutWindow) {
    // Never clamp: an empty window here means the source timestamps are
    // inconsistent with the scan-line count, which must surface as a
    // data-quality failure.
    error!(
        orbit = %key,
        window = %window,
        "degenerate {} window, orbit skipped",
        which
    );
    summary.degenerate_windows += 1;
}

async fn write_begin(
    catalog: &dyn FullCatalog,
    summary: &mut RunSummary,
    key: &OrbitKey,
    window: CutWindow,
) -> Result<(), CatalogError> {
    if window.is_degenerate() {
        report_degenerate(summary, key, "begin_cut", window);
        return Ok(());
    }
    record_write(
        summary,
        catalog.write_begin_cut(key, window).await,
        key,
        "begin_cut",
    )
    .map(|_| ())
}

async fn write_end(
    catalog: &dyn FullCatalog,
    summary: &mut RunSummary,
    key: &OrbitKey,
    window: CutWindow,
    midnight_scanline: Option<i32>,
) -> Result<(), CatalogError> {
    if window.is_degenerate() {
        report_degenerate(summary, key, "end_cut", window);
        return Ok(());
    }
    let written = record_write(
        summary,
        catalog.write_end_cut(key, window, midnight_scanline).await,
        key,
        "end_cut",
    )?;
    if written {
        summary.orbits_updated += 1;
    }
    Ok(())
}

/// Classify a write outcome: success, per-orbit conflict (local recovery,
/// scan continues), or store failure (fatal for the run).
fn record_write(
    summary: &mut RunSummary,
    result: CatalogResult<()>,
    key: &OrbitKey,
    which: &str,
) -> Result<bool, CatalogError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_store_unavailable() => Err(e),
        Err(e) => {
            error!(orbit = %key, error = %e, "{} write rejected", which);
            summary.conflicts += 1;
            Ok(false)
        }
    }
}
