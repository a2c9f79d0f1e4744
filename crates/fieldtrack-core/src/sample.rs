//! Location sample types — the fundamental unit of the track store.
//!
//! A sample is an immutable GPS fix recorded for a surveyor at a point in
//! event time. Samples are never updated or deleted; the store is strictly
//! append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Geometry ────────────────────────────────────────────────────────────────

/// A WGS 84 point, longitude first to match GeoJSON coordinate order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub longitude: f64,
  pub latitude:  f64,
}

// ─── Persisted sample ────────────────────────────────────────────────────────

/// One persisted GPS fix. `sample_id` is assigned by the store on append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
  pub sample_id:   i64,
  pub surveyor_id: String,
  pub latitude:    f64,
  pub longitude:   f64,
  /// Event time supplied by the reporting client — not server receipt time.
  pub timestamp:   DateTime<Utc>,
  /// Derived geometry; null until a projection step fills it in.
  pub geom:        Option<GeoPoint>,
}

/// A sample about to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
  pub surveyor_id: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub timestamp:   DateTime<Utc>,
  pub geom:        Option<GeoPoint>,
}

// ─── Incoming update ─────────────────────────────────────────────────────────

/// A live location update as reported by a client, before any persistence.
///
/// This is also the payload delivered to fan-out subscribers, so it carries
/// everything a live consumer needs and nothing store-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdate {
  pub surveyor_id: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub timestamp:   DateTime<Utc>,
}

impl LiveUpdate {
  /// Check required fields and coordinate bounds.
  ///
  /// Coordinates must be finite and within ±90 / ±180.
  pub fn validate(&self) -> Result<()> {
    if self.surveyor_id.trim().is_empty() {
      return Err(Error::EmptySurveyorId);
    }
    if !self.latitude.is_finite() {
      return Err(Error::NonFiniteLatitude(self.latitude));
    }
    if !self.longitude.is_finite() {
      return Err(Error::NonFiniteLongitude(self.longitude));
    }
    if !(-90.0..=90.0).contains(&self.latitude) {
      return Err(Error::LatitudeOutOfRange(self.latitude));
    }
    if !(-180.0..=180.0).contains(&self.longitude) {
      return Err(Error::LongitudeOutOfRange(self.longitude));
    }
    Ok(())
  }
}

impl From<LiveUpdate> for NewSample {
  fn from(update: LiveUpdate) -> Self {
    NewSample {
      surveyor_id: update.surveyor_id,
      latitude:    update.latitude,
      longitude:   update.longitude,
      timestamp:   update.timestamp,
      geom:        None,
    }
  }
}
