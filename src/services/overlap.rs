//! Scan-line overlap arithmetic for adjacent orbit pairs.

use crate::models::OrbitSpan;

/// Number of `next`'s leading scan lines timestamped at or before
/// `current.end_time`.
///
/// The overlapping time span is converted to scan lines at the platform's
/// fixed cadence, rounded to the nearest line, and clamped to
/// `[0, min(current.along_track_length, next.along_track_length)]`.
/// Callers must only invoke this when `current.end_time >= next.start_time`;
/// a touching pair (equality) yields 0.
pub fn overlap_scanlines(current: &OrbitSpan, next: &OrbitSpan) -> i32 {
    let span = current.end_time - next.start_time;
    let seconds = span.num_milliseconds() as f64 / 1000.0;
    let lines = (seconds * current.satellite.scan_rate()).round() as i64;

    let ceiling = current.along_track_length.min(next.along_track_length) as i64;
    lines.clamp(0, ceiling) as i32
}

#[cfg(test)]
mod tests {
    use super::overlap_scanlines;
    use crate::models::{OrbitSpan, Satellite};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn orbit(start: DateTime<Utc>, end: DateTime<Utc>, length: i32) -> OrbitSpan {
        OrbitSpan {
            satellite: Satellite::Noaa18,
            start_time: start,
            end_time: end,
            along_track_length: length,
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2009, 6, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_five_minute_overlap_is_600_lines() {
        let current = orbit(at(10, 0, 0), at(11, 40, 0), 2000);
        let next = orbit(at(11, 35, 0), at(13, 10, 0), 2000);
        assert_eq!(overlap_scanlines(&current, &next), 600);
    }

    #[test]
    fn test_touching_orbits_share_no_lines() {
        let current = orbit(at(11, 35, 0), at(13, 10, 0), 2000);
        let next = orbit(at(13, 10, 0), at(14, 50, 0), 2000);
        assert_eq!(overlap_scanlines(&current, &next), 0);
    }

    #[test]
    fn test_subsecond_overlap_rounds_to_nearest_line() {
        // 0.3 s at 2 lines/s is 0.6 lines, rounding to 1.
        let current = orbit(at(10, 0, 0), at(11, 40, 0) + Duration::milliseconds(300), 2000);
        let next = orbit(at(11, 40, 0), at(13, 10, 0), 2000);
        assert_eq!(overlap_scanlines(&current, &next), 1);

        // 0.2 s is 0.4 lines, rounding to 0.
        let current = orbit(at(10, 0, 0), at(11, 40, 0) + Duration::milliseconds(200), 2000);
        assert_eq!(overlap_scanlines(&current, &next), 0);
    }

    #[test]
    fn test_count_clamped_to_shorter_orbit() {
        // 600 s of overlap is 1200 lines, but the later orbit only has 800.
        let current = orbit(at(10, 0, 0), at(11, 45, 0), 2000);
        let next = orbit(at(11, 35, 0), at(13, 10, 0), 800);
        assert_eq!(overlap_scanlines(&current, &next), 800);
    }
}
