//! Surveyor — the identity record a track hangs off.
//!
//! The id is a stable external key (e.g. `SURV001`) assigned by the
//! provisioning flow, never generated here. The credential secret lives with
//! the authentication layer, not on this type, so it cannot leak through a
//! serialized response.

use serde::{Deserialize, Serialize};

/// A field surveyor known to the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surveyor {
  pub id:       String,
  pub name:     String,
  pub city:     Option<String>,
  pub project:  Option<String>,
  /// Unique login name; resolved to `id` by the authenticator.
  pub username: String,
}
