//! Orbit records and derived cut windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Satellite;

/// One satellite pass as produced by the ingestion pipeline.
///
/// `start_time` and `end_time` are the timestamps of the first and last scan
/// line; `along_track_length` is the scan-line count as originally produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitSpan {
    pub satellite: Satellite,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub along_track_length: i32,
}

impl OrbitSpan {
    /// Natural key used to address this orbit in the catalog.
    pub fn key(&self) -> OrbitKey {
        OrbitKey {
            satellite: self.satellite,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Wall-clock duration of the pass.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Natural key of an orbit record: `(satellite, start_time, end_time)`.
///
/// The Writer addresses orbits by this key, matching how the Reader
/// identified them, never by a surrogate id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitKey {
    pub satellite: Satellite,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl std::fmt::Display for OrbitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}..{}",
            self.satellite,
            self.start_time.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.end_time.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        )
    }
}

/// Half-open scan-line window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutWindow {
    pub start: i32,
    pub end: i32,
}

impl CutWindow {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// The full window of an orbit with `length` scan lines.
    pub fn full(length: i32) -> Self {
        Self {
            start: 0,
            end: length,
        }
    }

    /// Number of scan lines in the window.
    pub fn len(&self) -> i32 {
        self.end - self.start
    }

    /// An empty or negative-length window. Such a window must never be
    /// persisted; it signals corrupt source timestamps.
    pub fn is_degenerate(&self) -> bool {
        self.start >= self.end
    }
}

impl std::fmt::Display for CutWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The five engine-written fields of one orbit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitResolution {
    /// Window to use when approaching the orbit from its beginning, after
    /// removing lines duplicating the previous orbit's tail.
    pub begin_cut: CutWindow,
    /// Window to use when approaching the orbit from its end, after removing
    /// lines duplicating the next orbit's head.
    pub end_cut: CutWindow,
    /// Scan-line index where the orbit's timestamp crosses UTC midnight.
    pub midnight_scanline: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn span() -> OrbitSpan {
        OrbitSpan {
            satellite: Satellite::Noaa18,
            start_time: Utc.with_ymd_and_hms(2009, 6, 1, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2009, 6, 1, 11, 40, 0).unwrap(),
            along_track_length: 12000,
        }
    }

    #[test]
    fn test_key_matches_span_fields() {
        let s = span();
        let key = s.key();
        assert_eq!(key.satellite, s.satellite);
        assert_eq!(key.start_time, s.start_time);
        assert_eq!(key.end_time, s.end_time);
    }

    #[test]
    fn test_duration() {
        assert_eq!(span().duration(), Duration::seconds(6000));
    }

    #[test]
    fn test_full_window() {
        let w = CutWindow::full(2000);
        assert_eq!(w.start, 0);
        assert_eq!(w.end, 2000);
        assert_eq!(w.len(), 2000);
        assert!(!w.is_degenerate());
    }

    #[test]
    fn test_degenerate_windows() {
        assert!(CutWindow::new(100, 100).is_degenerate());
        assert!(CutWindow::new(100, 50).is_degenerate());
        assert!(!CutWindow::new(0, 1).is_degenerate());
    }
}
