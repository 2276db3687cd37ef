use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::orbits;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = orbits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // Some fields used only for database operations
pub struct OrbitRow {
    pub orbit_id: i64,
    pub satellite: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub along_track_length: i32,
    pub begin_cut_start: Option<i32>,
    pub begin_cut_end: Option<i32>,
    pub end_cut_start: Option<i32>,
    pub end_cut_end: Option<i32>,
    pub midnight_scanline: Option<i32>,
    pub blacklisted: bool,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orbits)]
pub struct NewOrbitRow {
    pub satellite: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub along_track_length: i32,
    pub blacklisted: bool,
}
