//! Handlers for track queries and the live-location ingest path.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/location/:surveyor_id/latest` | 404 when no sample |
//! | `GET`  | `/api/location/:surveyor_id/track`  | `?start=&end=` RFC 3339 |
//! | `POST` | `/api/live/location` | Basic auth; body is a `LiveUpdate` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use fieldtrack_core::{
  ingest::Ack,
  sample::{LiveUpdate, LocationSample},
  store::{SurveyorStore, TrackStore},
};

use crate::{AppState, auth::credential_from_headers, error::ApiError};

// ─── Latest ───────────────────────────────────────────────────────────────────

/// `GET /api/location/:surveyor_id/latest`
pub async fn latest<S>(
  State(state): State<AppState<S>>,
  Path(surveyor_id): Path<String>,
) -> Result<Json<LocationSample>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let sample = state
    .store
    .latest(&surveyor_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no samples for surveyor {surveyor_id}"))
    })?;
  Ok(Json(sample))
}

// ─── Track ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TrackParams {
  pub start: Option<DateTime<Utc>>,
  pub end:   Option<DateTime<Utc>>,
}

/// `GET /api/location/:surveyor_id/track?start=<rfc3339>&end=<rfc3339>`
///
/// With both bounds this is an inclusive range query. With one bound (or
/// none) it returns the entire history — a deliberate fallback, not a
/// half-open range.
pub async fn track<S>(
  State(state): State<AppState<S>>,
  Path(surveyor_id): Path<String>,
  Query(params): Query<TrackParams>,
) -> Result<Json<Vec<LocationSample>>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let samples = match (params.start, params.end) {
    (Some(start), Some(end)) => state
      .store
      .range(&surveyor_id, start, end)
      .await
      .map_err(ApiError::store)?,
    _ => state
      .store
      .history(&surveyor_id)
      .await
      .map_err(ApiError::store)?,
  };
  Ok(Json(samples))
}

// ─── Live ingest ──────────────────────────────────────────────────────────────

/// `POST /api/live/location` — authenticate, touch presence, broadcast,
/// persist. The `Ack` does not imply durability on its own: a store failure
/// after the broadcast surfaces as a 500 even though live subscribers
/// already saw the update.
pub async fn publish_live<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(update): Json<LiveUpdate>,
) -> Result<Json<Ack>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let credential = credential_from_headers(&headers)?;

  let ack = state
    .ingestor
    .ingest(update, &credential, Utc::now())
    .await?;

  tracing::info!(
    surveyor_id = %ack.surveyor_id,
    sample_id = ack.sample_id,
    delivered = ack.delivered,
    "live location accepted"
  );
  Ok(Json(ack))
}
