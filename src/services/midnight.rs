//! Midnight classifier.
//!
//! Decides whether one orbit straddles a UTC calendar-day boundary and at
//! which scan-line index, so downstream day-bucketed aggregation can split
//! the orbit instead of mis-bucketing its scan lines.

use chrono::{Days, NaiveTime, TimeZone, Utc};

use crate::models::OrbitSpan;

/// Scan-line index where the orbit crosses UTC midnight, or `None` when
/// start and end fall on the same calendar date.
///
/// The index is the scan line nearest the midnight instant, interpolated at
/// the platform's fixed cadence and clamped to `[0, along_track_length)`.
/// It is stored verbatim and never affects cut windows.
pub fn classify(orbit: &OrbitSpan) -> Option<i32> {
    if orbit.end_time.date_naive() == orbit.start_time.date_naive() {
        return None;
    }
    if orbit.along_track_length <= 0 {
        return None;
    }

    let midnight_naive = orbit
        .start_time
        .date_naive()
        .checked_add_days(Days::new(1))?
        .and_time(NaiveTime::MIN);
    let midnight = Utc.from_utc_datetime(&midnight_naive);

    let elapsed = (midnight - orbit.start_time).num_milliseconds() as f64 / 1000.0;
    let index = (elapsed * orbit.satellite.scan_rate()).round() as i64;

    Some(index.clamp(0, orbit.along_track_length as i64 - 1) as i32)
}

#[cfg(test)]
mod tests {
    use super::classify;
    use crate::models::{OrbitSpan, Satellite};
    use chrono::{DateTime, NaiveDateTime, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .unwrap()
            .and_utc()
    }

    fn orbit(start: &str, end: &str, length: i32) -> OrbitSpan {
        OrbitSpan {
            satellite: Satellite::Noaa18,
            start_time: ts(start),
            end_time: ts(end),
            along_track_length: length,
        }
    }

    #[test]
    fn test_same_day_orbit_has_no_midnight() {
        let o = orbit("2009-06-01 10:00:00", "2009-06-01 11:40:00", 12000);
        assert_eq!(classify(&o), None);
    }

    #[test]
    fn test_midnight_index_interpolated_at_scan_rate() {
        // Midnight falls 600 s after orbit start: at 2 lines/s that is
        // scan line 1200.
        let o = orbit("2009-06-01 23:50:00", "2009-06-02 00:30:00", 4800);
        assert_eq!(classify(&o), Some(1200));
    }

    #[test]
    fn test_midnight_index_rounds_subsecond_offsets() {
        // 599.3 s to midnight -> 1198.6 lines -> 1199.
        let o = orbit("2009-06-01 23:50:00.700", "2009-06-02 00:30:00", 4800);
        assert_eq!(classify(&o), Some(1199));
    }

    #[test]
    fn test_index_clamped_below_along_track_length() {
        // Orbit ends exactly at midnight; the end timestamp's date is the
        // next day, and the raw index equals the length. Clamp keeps it
        // strictly inside the orbit.
        let o = orbit("2009-06-01 23:50:00", "2009-06-02 00:00:00", 1200);
        assert_eq!(classify(&o), Some(1199));
    }

    #[test]
    fn test_index_strictly_inside_window() {
        let o = orbit("2009-06-01 22:30:00", "2009-06-02 00:10:00", 12000);
        let idx = classify(&o).unwrap();
        assert!(idx >= 0 && idx < o.along_track_length);
    }

    #[test]
    fn test_zero_length_orbit_has_no_index() {
        let o = orbit("2009-06-01 23:50:00", "2009-06-02 00:30:00", 0);
        assert_eq!(classify(&o), None);
    }
}
