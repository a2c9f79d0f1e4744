//! The `TrackStore` and `SurveyorStore` traits.
//!
//! Implemented by storage backends (e.g. `fieldtrack-store-sqlite`). Higher
//! layers (`fieldtrack-api`) depend on these abstractions, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  sample::{LocationSample, NewSample},
  surveyor::Surveyor,
};

// ─── Track store ─────────────────────────────────────────────────────────────

/// Durable, append-only log of location samples queryable by surveyor and
/// time range.
///
/// Appends and reads may block on I/O and are the core's only suspension
/// points. No update or delete operation exists; a sample is owned by the
/// store once `append` returns.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes (tokio with `axum`).
pub trait TrackStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist one sample and return it with its store-assigned id.
  fn append(
    &self,
    sample: NewSample,
  ) -> impl Future<Output = Result<LocationSample, Self::Error>> + Send + '_;

  /// Most recent sample for a surveyor by event timestamp, ties broken by
  /// insertion order. `None` if the surveyor has no samples.
  fn latest<'a>(
    &'a self,
    surveyor_id: &'a str,
  ) -> impl Future<Output = Result<Option<LocationSample>, Self::Error>> + Send + 'a;

  /// Samples with `start <= timestamp <= end`, ascending by timestamp.
  fn range<'a>(
    &'a self,
    surveyor_id: &'a str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<LocationSample>, Self::Error>> + Send + 'a;

  /// The entire history for a surveyor, ascending by timestamp.
  fn history<'a>(
    &'a self,
    surveyor_id: &'a str,
  ) -> impl Future<Output = Result<Vec<LocationSample>, Self::Error>> + Send + 'a;
}

// ─── Surveyor store ──────────────────────────────────────────────────────────

/// Registry of surveyors and their credentials.
///
/// The credential hash is write-only from the provisioning path and readable
/// only through [`SurveyorStore::credential_hash`]; it never rides on the
/// [`Surveyor`] record itself.
pub trait SurveyorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create or replace a surveyor. `password_hash` is an argon2 PHC string;
  /// `None` keeps any existing hash.
  fn upsert(
    &self,
    surveyor: Surveyor,
    password_hash: Option<String>,
  ) -> impl Future<Output = Result<Surveyor, Self::Error>> + Send + '_;

  /// Retrieve a surveyor by id. Returns `None` if not found.
  fn get<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Surveyor>, Self::Error>> + Send + 'a;

  /// All surveyors, ordered by id.
  fn list(
    &self,
  ) -> impl Future<Output = Result<Vec<Surveyor>, Self::Error>> + Send + '_;

  /// Surveyors matching the given filters; an absent filter matches all.
  fn filter<'a>(
    &'a self,
    city: Option<&'a str>,
    project: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<Surveyor>, Self::Error>> + Send + 'a;

  /// Look a surveyor up by login name.
  fn find_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Surveyor>, Self::Error>> + Send + 'a;

  /// Whether a login name is already taken.
  fn username_taken<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The stored argon2 PHC string for a login name, if any.
  fn credential_hash<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;
}
