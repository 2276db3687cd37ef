//! Resolver tests against the in-memory catalog.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::db::repositories::LocalCatalog;
use crate::db::repository::{CatalogError, CatalogReader, CatalogResult, CatalogWriter};
use crate::models::{CutWindow, OrbitKey, OrbitSpan, Satellite};
use crate::services::resolver::{resolve_all, resolve_satellite};

fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2009, 6, day, h, m, 0).unwrap()
}

fn orbit(
    satellite: Satellite,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    length: i32,
) -> OrbitSpan {
    OrbitSpan {
        satellite,
        start_time: start,
        end_time: end,
        along_track_length: length,
    }
}

#[tokio::test]
async fn test_three_orbit_worked_example() {
    // O1 [10:00, 11:40), O2 [11:35, 13:10), O3 [13:10, 14:50), 2000 lines
    // each. O1/O2 overlap 300 s = 600 lines; O2/O3 touch.
    let catalog = LocalCatalog::new();
    let o1 = orbit(Satellite::Noaa18, at(1, 10, 0), at(1, 11, 40), 2000);
    let o2 = orbit(Satellite::Noaa18, at(1, 11, 35), at(1, 13, 10), 2000);
    let o3 = orbit(Satellite::Noaa18, at(1, 13, 10), at(1, 14, 50), 2000);
    catalog.insert_orbit(o1);
    catalog.insert_orbit(o2);
    catalog.insert_orbit(o3);

    let summary = resolve_satellite(&catalog, Satellite::Noaa18)
        .await
        .unwrap();
    assert!(!summary.is_failed());
    assert_eq!(summary.orbit_count, 3);
    assert_eq!(summary.orbits_updated, 3);

    let r1 = catalog.resolution(&o1.key()).unwrap();
    assert_eq!(r1.begin_cut, CutWindow::new(0, 2000));
    assert_eq!(r1.end_cut, CutWindow::new(0, 1400));

    let r2 = catalog.resolution(&o2.key()).unwrap();
    assert_eq!(r2.begin_cut, CutWindow::new(600, 2000));
    assert_eq!(r2.end_cut, CutWindow::new(0, 2000));

    let r3 = catalog.resolution(&o3.key()).unwrap();
    assert_eq!(r3.begin_cut, CutWindow::new(0, 2000));
    assert_eq!(r3.end_cut, CutWindow::new(0, 2000));
}

#[tokio::test]
async fn test_single_orbit_gets_full_windows() {
    let catalog = LocalCatalog::new();
    let o = orbit(Satellite::Noaa15, at(1, 10, 0), at(1, 11, 40), 12000);
    catalog.insert_orbit(o);

    let summary = resolve_satellite(&catalog, Satellite::Noaa15)
        .await
        .unwrap();
    assert!(!summary.is_failed());
    assert_eq!(summary.orbits_updated, 1);

    let r = catalog.resolution(&o.key()).unwrap();
    assert_eq!(r.begin_cut, CutWindow::full(12000));
    assert_eq!(r.end_cut, CutWindow::full(12000));
    assert_eq!(r.midnight_scanline, None);
}

#[tokio::test]
async fn test_gapped_pair_keeps_both_windows_full() {
    let catalog = LocalCatalog::new();
    let o1 = orbit(Satellite::Noaa17, at(1, 10, 0), at(1, 11, 40), 2000);
    let o2 = orbit(Satellite::Noaa17, at(1, 12, 0), at(1, 13, 40), 2000);
    catalog.insert_orbit(o1);
    catalog.insert_orbit(o2);

    resolve_satellite(&catalog, Satellite::Noaa17).await.unwrap();

    assert_eq!(catalog.end_cut(&o1.key()), Some(CutWindow::full(2000)));
    assert_eq!(catalog.begin_cut(&o2.key()), Some(CutWindow::full(2000)));
}

#[tokio::test]
async fn test_window_lengths_bounded_by_along_track_length() {
    let catalog = LocalCatalog::new();
    let o1 = orbit(Satellite::Noaa19, at(1, 10, 0), at(1, 11, 40), 2000);
    let o2 = orbit(Satellite::Noaa19, at(1, 11, 30), at(1, 13, 10), 2000);
    let o3 = orbit(Satellite::Noaa19, at(1, 13, 5), at(1, 14, 45), 2000);
    catalog.insert_orbit(o1);
    catalog.insert_orbit(o2);
    catalog.insert_orbit(o3);

    resolve_satellite(&catalog, Satellite::Noaa19).await.unwrap();

    for o in [o1, o2, o3] {
        let r = catalog.resolution(&o.key()).unwrap();
        assert!(r.begin_cut.len() <= o.along_track_length);
        assert!(r.end_cut.len() <= o.along_track_length);
        assert!(r.begin_cut.start >= 0 && r.begin_cut.end <= o.along_track_length);
        assert!(r.end_cut.start >= 0 && r.end_cut.end <= o.along_track_length);
    }
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let catalog = LocalCatalog::new();
    let o1 = orbit(Satellite::Noaa18, at(1, 10, 0), at(1, 11, 40), 2000);
    let o2 = orbit(Satellite::Noaa18, at(1, 11, 35), at(1, 13, 10), 2000);
    catalog.insert_orbit(o1);
    catalog.insert_orbit(o2);

    resolve_satellite(&catalog, Satellite::Noaa18).await.unwrap();
    let first_r1 = catalog.resolution(&o1.key()).unwrap();
    let first_r2 = catalog.resolution(&o2.key()).unwrap();

    resolve_satellite(&catalog, Satellite::Noaa18).await.unwrap();
    assert_eq!(catalog.resolution(&o1.key()).unwrap(), first_r1);
    assert_eq!(catalog.resolution(&o2.key()).unwrap(), first_r2);
}

#[tokio::test]
async fn test_midnight_orbit_recorded_in_end_of_orbit_update() {
    let catalog = LocalCatalog::new();
    // Midnight falls 600 s after start: scan line 1200 at 2 lines/s.
    let o = orbit(Satellite::MetopA, at(1, 23, 50), at(2, 1, 30), 12000);
    catalog.insert_orbit(o);

    resolve_satellite(&catalog, Satellite::MetopA).await.unwrap();

    let r = catalog.resolution(&o.key()).unwrap();
    assert_eq!(r.midnight_scanline, Some(1200));
    assert!(r.midnight_scanline.unwrap() < o.along_track_length);
}

#[tokio::test]
async fn test_degenerate_window_reported_not_clamped() {
    let catalog = LocalCatalog::new();
    // The pair overlaps for 50 minutes but the later orbit only has 100
    // scan lines: the clamped redundant count equals its full length,
    // leaving an empty begin-cut window.
    let o1 = orbit(Satellite::Noaa16, at(1, 10, 0), at(1, 11, 0), 2000);
    let o2 = orbit(Satellite::Noaa16, at(1, 10, 10), at(1, 11, 30), 100);
    catalog.insert_orbit(o1);
    catalog.insert_orbit(o2);

    let summary = resolve_satellite(&catalog, Satellite::Noaa16)
        .await
        .unwrap();
    assert!(summary.is_failed());
    assert_eq!(summary.degenerate_windows, 1);

    // The degenerate begin-cut was never written; the rest of the scan
    // continued normally.
    assert_eq!(catalog.begin_cut(&o2.key()), None);
    assert_eq!(catalog.end_cut(&o1.key()), Some(CutWindow::new(0, 1900)));
    assert_eq!(catalog.end_cut(&o2.key()), Some(CutWindow::full(100)));
}

#[tokio::test]
async fn test_empty_satellite_is_a_noop() {
    let catalog = LocalCatalog::new();
    let summary = resolve_satellite(&catalog, Satellite::MetopC)
        .await
        .unwrap();
    assert!(!summary.is_failed());
    assert_eq!(summary.orbit_count, 0);
    assert_eq!(summary.orbits_updated, 0);
}

#[tokio::test]
async fn test_run_lock_released_after_scan() {
    let catalog = LocalCatalog::new();
    catalog.insert_orbit(orbit(Satellite::Noaa18, at(1, 10, 0), at(1, 11, 40), 2000));

    resolve_satellite(&catalog, Satellite::Noaa18).await.unwrap();
    // A second run must be able to reacquire the lock.
    resolve_satellite(&catalog, Satellite::Noaa18).await.unwrap();
}

#[tokio::test]
async fn test_resolve_all_isolates_satellite_failures() {
    let catalog = Arc::new(LocalCatalog::new());

    // A clean satellite...
    let clean = orbit(Satellite::Noaa18, at(1, 10, 0), at(1, 11, 40), 2000);
    catalog.insert_orbit(clean);

    // ...and one with a corrupt pair.
    catalog.insert_orbit(orbit(Satellite::Noaa16, at(1, 10, 0), at(1, 11, 0), 2000));
    catalog.insert_orbit(orbit(Satellite::Noaa16, at(1, 10, 10), at(1, 11, 30), 100));

    let report = resolve_all(
        catalog.clone() as Arc<dyn crate::db::FullCatalog>,
        &[Satellite::Noaa18, Satellite::Noaa16],
    )
    .await;

    assert!(report.is_failed());
    let by_sat = |s: Satellite| {
        report
            .summaries
            .iter()
            .find(|r| r.satellite == s)
            .unwrap()
    };
    assert!(!by_sat(Satellite::Noaa18).is_failed());
    assert!(by_sat(Satellite::Noaa16).is_failed());
    assert_eq!(
        catalog.resolution(&clean.key()).unwrap().begin_cut,
        CutWindow::full(2000)
    );
}

#[tokio::test]
async fn test_duplicate_key_conflict_allows_local_recovery() {
    let catalog = LocalCatalog::new();
    // The middle orbit was ingested twice; every write addressed to its
    // natural key is rejected as a conflict, but the neighbors still
    // resolve.
    let o1 = orbit(Satellite::Noaa18, at(1, 10, 0), at(1, 11, 40), 2000);
    let dup = orbit(Satellite::Noaa18, at(1, 12, 0), at(1, 13, 40), 2000);
    let o3 = orbit(Satellite::Noaa18, at(1, 14, 0), at(1, 15, 40), 2000);
    catalog.insert_orbit(o1);
    catalog.insert_orbit(dup);
    catalog.insert_orbit(dup);
    catalog.insert_orbit(o3);

    let summary = resolve_satellite(&catalog, Satellite::Noaa18)
        .await
        .unwrap();
    assert!(summary.is_failed());
    assert_eq!(summary.conflicts, 2);

    // The clean orbits before and after the duplicate are fully resolved.
    let r1 = catalog.resolution(&o1.key()).unwrap();
    assert_eq!(r1.begin_cut, CutWindow::full(2000));
    assert_eq!(r1.end_cut, CutWindow::full(2000));
    let r3 = catalog.resolution(&o3.key()).unwrap();
    assert_eq!(r3.begin_cut, CutWindow::full(2000));
    assert_eq!(r3.end_cut, CutWindow::full(2000));
}

#[tokio::test]
async fn test_zero_length_orbit_reported_not_written() {
    let catalog = LocalCatalog::new();
    // A corrupt orbit with no scan lines: even its full windows are empty
    // and must surface as data-quality failures instead of a [0, 0) record.
    let o = orbit(Satellite::Noaa17, at(1, 10, 0), at(1, 11, 40), 0);
    catalog.insert_orbit(o);

    let summary = resolve_satellite(&catalog, Satellite::Noaa17)
        .await
        .unwrap();
    assert!(summary.is_failed());
    assert_eq!(summary.degenerate_windows, 2);
    assert_eq!(summary.orbits_updated, 0);
    assert_eq!(catalog.begin_cut(&o.key()), None);
    assert_eq!(catalog.end_cut(&o.key()), None);
}

/// Writer whose store has gone away: reads succeed, every write fails
/// with a connection error.
struct DisconnectedStore {
    orbits: Vec<OrbitSpan>,
    writes_attempted: AtomicUsize,
}

impl DisconnectedStore {
    fn with_orbits(orbits: Vec<OrbitSpan>) -> Self {
        Self {
            orbits,
            writes_attempted: AtomicUsize::new(0),
        }
    }

    fn refuse_write(&self) -> CatalogResult<()> {
        self.writes_attempted.fetch_add(1, Ordering::SeqCst);
        Err(CatalogError::connection("store went away"))
    }
}

#[async_trait]
impl CatalogReader for DisconnectedStore {
    async fn health_check(&self) -> CatalogResult<bool> {
        Ok(false)
    }

    async fn fetch_orbits(&self, satellite: Satellite) -> CatalogResult<Vec<OrbitSpan>> {
        Ok(self
            .orbits
            .iter()
            .filter(|o| o.satellite == satellite)
            .copied()
            .collect())
    }
}

#[async_trait]
impl CatalogWriter for DisconnectedStore {
    async fn write_begin_cut(&self, _key: &OrbitKey, _window: CutWindow) -> CatalogResult<()> {
        self.refuse_write()
    }

    async fn write_end_cut(
        &self,
        _key: &OrbitKey,
        _window: CutWindow,
        _midnight_scanline: Option<i32>,
    ) -> CatalogResult<()> {
        self.refuse_write()
    }

    async fn begin_run(&self, _satellite: Satellite) -> CatalogResult<()> {
        Ok(())
    }

    async fn finish_run(&self, _satellite: Satellite) -> CatalogResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_unreachable_store_aborts_scan_on_first_write() {
    let store = DisconnectedStore::with_orbits(vec![
        orbit(Satellite::Noaa18, at(1, 10, 0), at(1, 11, 40), 2000),
        orbit(Satellite::Noaa18, at(1, 12, 0), at(1, 13, 40), 2000),
        orbit(Satellite::Noaa18, at(1, 14, 0), at(1, 15, 40), 2000),
    ]);

    let err = resolve_satellite(&store, Satellite::Noaa18)
        .await
        .unwrap_err();
    assert!(err.is_store_unavailable());
    // The run aborts at the first failed write; no per-orbit recovery.
    assert_eq!(store.writes_attempted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resolve_all_reports_unreachable_store_as_failed() {
    let store = Arc::new(DisconnectedStore::with_orbits(vec![orbit(
        Satellite::Noaa18,
        at(1, 10, 0),
        at(1, 11, 40),
        2000,
    )]));

    let report = resolve_all(
        store.clone() as Arc<dyn crate::db::FullCatalog>,
        &[Satellite::Noaa18],
    )
    .await;

    assert!(report.is_failed());
    let summary = &report.summaries[0];
    assert_eq!(summary.satellite, Satellite::Noaa18);
    assert!(summary.fatal.is_some());
}

#[tokio::test]
async fn test_blacklisted_neighbor_makes_survivors_adjacent() {
    let catalog = LocalCatalog::new();
    // The middle orbit is excluded; the survivors overlap by 2 minutes
    // (240 lines) and are resolved as a direct pair.
    let o1 = orbit(Satellite::Noaa18, at(1, 10, 0), at(1, 11, 40), 2000);
    let excluded = orbit(Satellite::Noaa18, at(1, 11, 0), at(1, 12, 30), 2000);
    let o3 = orbit(Satellite::Noaa18, at(1, 11, 38), at(1, 13, 10), 2000);
    catalog.insert_orbit(o1);
    catalog.insert_blacklisted(excluded);
    catalog.insert_orbit(o3);

    let summary = resolve_satellite(&catalog, Satellite::Noaa18)
        .await
        .unwrap();
    assert_eq!(summary.orbit_count, 2);

    assert_eq!(catalog.end_cut(&o1.key()), Some(CutWindow::new(0, 1760)));
    assert_eq!(catalog.begin_cut(&o3.key()), Some(CutWindow::new(240, 2000)));
    assert_eq!(catalog.resolution(&excluded.key()), None);
}
