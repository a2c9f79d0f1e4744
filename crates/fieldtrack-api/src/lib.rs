//! REST + WebSocket surface for the fieldtrack backend.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`TrackStore`] and [`SurveyorStore`]. TLS and reverse-proxy concerns are
//! the deployment's responsibility.

pub mod auth;
pub mod error;
pub mod live;
pub mod location;
pub mod surveyors;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use chrono::Duration;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use fieldtrack_core::{
  fanout::Fanout,
  ingest::Ingestor,
  presence::{DEFAULT_LIVENESS_WINDOW_SECS, PresenceClock, PresenceResolver},
  store::{SurveyorStore, TrackStore},
};

use auth::StoreAuthenticator;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Maximum age of an activity signal still counted as "online."
  #[serde(default = "default_liveness_window_secs")]
  pub liveness_window_secs: i64,
}

fn default_liveness_window_secs() -> i64 {
  DEFAULT_LIVENESS_WINDOW_SECS
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub clock:    Arc<PresenceClock>,
  pub fanout:   Arc<Fanout>,
  pub auth:     Arc<StoreAuthenticator<S>>,
  pub resolver: Arc<PresenceResolver<S>>,
  pub ingestor: Arc<Ingestor<S, StoreAuthenticator<S>>>,
  pub config:   Arc<ServerConfig>,
}

impl<S> AppState<S>
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  /// Wire the presence clock, fan-out, resolver, and ingestor around one
  /// shared store.
  pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
    let clock = Arc::new(PresenceClock::new());
    let fanout = Arc::new(Fanout::new());
    let auth = Arc::new(StoreAuthenticator::new(store.clone()));
    let resolver = Arc::new(
      PresenceResolver::new(clock.clone(), store.clone())
        .with_window(Duration::seconds(config.liveness_window_secs)),
    );
    let ingestor = Arc::new(Ingestor::new(
      clock.clone(),
      fanout.clone(),
      store.clone(),
      auth.clone(),
    ));

    Self {
      store,
      clock,
      fanout,
      auth,
      resolver,
      ingestor,
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: TrackStore + SurveyorStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Surveyor management
    .route(
      "/api/surveyors",
      get(surveyors::list::<S>).post(surveyors::create::<S>),
    )
    .route("/api/surveyors/login", post(surveyors::login::<S>))
    .route(
      "/api/surveyors/check-username",
      get(surveyors::check_username::<S>),
    )
    .route("/api/surveyors/filter", get(surveyors::filter::<S>))
    .route("/api/surveyors/status", get(surveyors::status::<S>))
    .route("/api/surveyors/{id}/activity", post(surveyors::activity::<S>))
    // Track queries
    .route("/api/location/{surveyor_id}/latest", get(location::latest::<S>))
    .route("/api/location/{surveyor_id}/track", get(location::track::<S>))
    // Live ingest + subscribe
    .route("/api/live/location", post(location::publish_live::<S>))
    .route("/ws/location/{surveyor_id}", get(live::stream::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
