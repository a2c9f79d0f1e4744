//! Handlers for `/api/surveyors` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/surveyors` | All surveyors with a derived `online` flag |
//! | `POST` | `/api/surveyors` | Create or update (provisioning) |
//! | `POST` | `/api/surveyors/login` | Body: `{"username","password"}` |
//! | `GET`  | `/api/surveyors/check-username` | `?username=` availability |
//! | `POST` | `/api/surveyors/:id/activity` | Explicit activity ping |
//! | `GET`  | `/api/surveyors/filter` | `?city=&project=` exact match |
//! | `GET`  | `/api/surveyors/status` | Map of id to `Online`/`Offline` |

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use fieldtrack_core::{
  ingest::{Authenticator as _, Credential},
  store::{SurveyorStore, TrackStore},
  surveyor::Surveyor,
};

use crate::{AppState, auth::hash_password, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SurveyorWithStatus {
  #[serde(flatten)]
  pub surveyor: Surveyor,
  pub online:   bool,
}

/// `GET /api/surveyors` — every surveyor, judged against one `now` snapshot.
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<SurveyorWithStatus>>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let surveyors = state.store.list().await.map_err(ApiError::store)?;
  let ids: Vec<String> = surveyors.iter().map(|s| s.id.clone()).collect();
  let statuses = state
    .resolver
    .statuses(ids, Utc::now())
    .await
    .map_err(ApiError::store)?;

  let listed = surveyors
    .into_iter()
    .map(|surveyor| {
      let online = statuses.get(&surveyor.id).copied().unwrap_or(false);
      SurveyorWithStatus { surveyor, online }
    })
    .collect();
  Ok(Json(listed))
}

// ─── Create / update ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProvisionBody {
  pub id:       String,
  pub name:     String,
  pub city:     Option<String>,
  pub project:  Option<String>,
  pub username: String,
  /// Plaintext only on the wire; stored as an argon2 PHC string. Absent
  /// means "keep the existing credential."
  pub password: Option<String>,
}

/// `POST /api/surveyors` — provisioning path, creates or replaces.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ProvisionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  if body.id.trim().is_empty() {
    return Err(ApiError::BadRequest("surveyor id must not be empty".into()));
  }

  let password_hash = body.password.as_deref().map(hash_password).transpose()?;
  let surveyor = Surveyor {
    id:       body.id,
    name:     body.name,
    city:     body.city,
    project:  body.project,
    username: body.username,
  };

  let stored = state
    .store
    .upsert(surveyor, password_hash)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(stored)))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub success:  bool,
  pub surveyor: Surveyor,
}

/// `POST /api/surveyors/login` — verify credentials; success counts as an
/// activity signal.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let credential =
    Credential { username: body.username, password: body.password };
  let surveyor_id = state
    .auth
    .verify(&credential)
    .await
    .ok_or(ApiError::Unauthorized)?;

  state.clock.touch(&surveyor_id, Utc::now());
  tracing::info!(%surveyor_id, "surveyor logged in");

  let surveyor = state
    .store
    .get(&surveyor_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;
  Ok(Json(LoginResponse { success: true, surveyor }))
}

// ─── Username availability ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckUsernameParams {
  pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
  pub available: bool,
}

/// `GET /api/surveyors/check-username?username=<name>`
pub async fn check_username<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<CheckUsernameParams>,
) -> Result<Json<AvailabilityResponse>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let taken = state
    .store
    .username_taken(&params.username)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(AvailabilityResponse { available: !taken }))
}

// ─── Activity ping ────────────────────────────────────────────────────────────

/// `POST /api/surveyors/:id/activity` — mark the surveyor active now.
pub async fn activity<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  state
    .store
    .get(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("surveyor {id} not found")))?;

  state.clock.touch(&id, Utc::now());
  Ok(StatusCode::NO_CONTENT)
}

// ─── Filter ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FilterParams {
  pub city:    Option<String>,
  pub project: Option<String>,
}

/// `GET /api/surveyors/filter?city=<c>&project=<p>`
pub async fn filter<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Surveyor>>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let surveyors = state
    .store
    .filter(params.city.as_deref(), params.project.as_deref())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(surveyors))
}

// ─── Status map ───────────────────────────────────────────────────────────────

/// `GET /api/surveyors/status` — `{"SURV001": "Online", ...}`, evaluated
/// against a single instant.
pub async fn status<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<HashMap<String, String>>, ApiError>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  let surveyors = state.store.list().await.map_err(ApiError::store)?;
  let statuses = state
    .resolver
    .statuses(surveyors.into_iter().map(|s| s.id), Utc::now())
    .await
    .map_err(ApiError::store)?;

  let rendered = statuses
    .into_iter()
    .map(|(id, online)| {
      (id, if online { "Online" } else { "Offline" }.to_string())
    })
    .collect();
  Ok(Json(rendered))
}
