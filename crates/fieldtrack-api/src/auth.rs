//! HTTP Basic-auth parsing and the store-backed credential verifier.
//!
//! Each surveyor authenticates with their own username/password; the store
//! keeps only argon2 PHC strings. Verification failure is opaque — an
//! unknown user and a wrong password are indistinguishable to the caller.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
             password_hash::SaltString};
use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;

use fieldtrack_core::{
  ingest::{Authenticator, Credential},
  store::SurveyorStore,
};

use crate::error::ApiError;

/// Pull a [`Credential`] out of an `Authorization: Basic` header.
pub fn credential_from_headers(
  headers: &HeaderMap,
) -> Result<Credential, ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) =
    creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  Ok(Credential {
    username: username.to_owned(),
    password: password.to_owned(),
  })
}

/// Hash a plaintext password into an argon2 PHC string for storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::BadRequest(format!("cannot hash password: {e}")))
}

/// [`Authenticator`] backed by the surveyor store's credential hashes.
pub struct StoreAuthenticator<S> {
  store: Arc<S>,
}

impl<S> StoreAuthenticator<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }
}

impl<S: SurveyorStore> Authenticator for StoreAuthenticator<S> {
  async fn verify(&self, credential: &Credential) -> Option<String> {
    let hash = self
      .store
      .credential_hash(&credential.username)
      .await
      .ok()
      .flatten()?;

    let parsed = PasswordHash::new(&hash).ok()?;
    Argon2::default()
      .verify_password(credential.password.as_bytes(), &parsed)
      .ok()?;

    let surveyor = self
      .store
      .find_by_username(&credential.username)
      .await
      .ok()
      .flatten()?;
    Some(surveyor.id)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderValue, header};
  use fieldtrack_core::surveyor::Surveyor;
  use fieldtrack_store_sqlite::SqliteStore;

  use super::*;

  fn basic(user: &str, pass: &str) -> HeaderValue {
    let encoded = B64.encode(format!("{user}:{pass}"));
    HeaderValue::from_str(&format!("Basic {encoded}")).unwrap()
  }

  #[test]
  fn parses_well_formed_basic_header() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, basic("surv1", "gps:pass"));

    let credential = credential_from_headers(&headers).unwrap();
    assert_eq!(credential.username, "surv1");
    // Only the first colon separates user from password.
    assert_eq!(credential.password, "gps:pass");
  }

  #[test]
  fn rejects_missing_header() {
    assert!(matches!(
      credential_from_headers(&HeaderMap::new()),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn rejects_non_basic_scheme() {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_static("Bearer token"),
    );
    assert!(matches!(
      credential_from_headers(&headers),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn rejects_invalid_base64() {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_static("Basic !!!not-base64!!!"),
    );
    assert!(matches!(
      credential_from_headers(&headers),
      Err(ApiError::Unauthorized)
    ));
  }

  async fn store_with_user(password: Option<&str>) -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let hash = password.map(|p| hash_password(p).unwrap());
    store
      .upsert(
        Surveyor {
          id:       "SURV001".into(),
          name:     "Asha".into(),
          city:     None,
          project:  None,
          username: "surv1".into(),
        },
        hash,
      )
      .await
      .unwrap();
    store
  }

  #[tokio::test]
  async fn verifies_correct_password() {
    let auth = StoreAuthenticator::new(store_with_user(Some("secret")).await);
    let credential =
      Credential { username: "surv1".into(), password: "secret".into() };
    assert_eq!(auth.verify(&credential).await.as_deref(), Some("SURV001"));
  }

  #[tokio::test]
  async fn rejects_wrong_password() {
    let auth = StoreAuthenticator::new(store_with_user(Some("secret")).await);
    let credential =
      Credential { username: "surv1".into(), password: "wrong".into() };
    assert!(auth.verify(&credential).await.is_none());
  }

  #[tokio::test]
  async fn rejects_unknown_user() {
    let auth = StoreAuthenticator::new(store_with_user(Some("secret")).await);
    let credential =
      Credential { username: "ghost".into(), password: "secret".into() };
    assert!(auth.verify(&credential).await.is_none());
  }

  #[tokio::test]
  async fn rejects_user_without_provisioned_credential() {
    let auth = StoreAuthenticator::new(store_with_user(None).await);
    let credential =
      Credential { username: "surv1".into(), password: "anything".into() };
    assert!(auth.verify(&credential).await.is_none());
  }
}
