//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, which order lexicographically
//! the same way they order chronologically, so SQL range comparisons work on
//! the raw column. Geometry is stored as compact JSON.

use chrono::{DateTime, Utc};
use fieldtrack_core::sample::{GeoPoint, LocationSample};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── GeoPoint ────────────────────────────────────────────────────────────────

pub fn encode_geom(point: &GeoPoint) -> Result<String> {
  Ok(serde_json::to_string(point)?)
}

pub fn decode_geom(s: &str) -> Result<GeoPoint> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row shapes ──────────────────────────────────────────────────────────────

/// A `location_track` row as read from SQLite, before text columns are
/// decoded. Decoding happens outside the connection closure so parse errors
/// surface as this crate's [`Error`], not as database errors.
pub struct RawSample {
  pub sample_id:   i64,
  pub surveyor_id: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub timestamp:   String,
  pub geom:        Option<String>,
}

impl RawSample {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawSample {
      sample_id:   row.get(0)?,
      surveyor_id: row.get(1)?,
      latitude:    row.get(2)?,
      longitude:   row.get(3)?,
      timestamp:   row.get(4)?,
      geom:        row.get(5)?,
    })
  }

  pub fn decode(self) -> Result<LocationSample> {
    Ok(LocationSample {
      sample_id:   self.sample_id,
      surveyor_id: self.surveyor_id,
      latitude:    self.latitude,
      longitude:   self.longitude,
      timestamp:   decode_dt(&self.timestamp)?,
      geom:        self.geom.as_deref().map(decode_geom).transpose()?,
    })
  }
}
