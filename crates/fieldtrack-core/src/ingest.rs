//! The live-location ingest pipeline.
//!
//! One accepted update touches the presence clock, reaches every live
//! subscriber, and lands in the track store — in that order. The broadcast
//! deliberately precedes persistence: live consumers see the update with at
//! most the channel-send latency of delay, not gated on store success. The
//! price is an accepted asymmetry — a store failure after a successful
//! broadcast leaves the update visible to subscribers but absent from
//! history, surfaced to the caller as [`IngestError::StoreFailure`].

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{
  fanout::Fanout,
  presence::PresenceClock,
  sample::LiveUpdate,
  store::TrackStore,
};

// ─── Authentication collaborator ─────────────────────────────────────────────

/// A username/password pair as presented by the reporting client.
#[derive(Debug, Clone)]
pub struct Credential {
  pub username: String,
  pub password: String,
}

/// Credential verification, implemented by the surrounding service.
///
/// `verify` resolves a credential to the authenticated surveyor's id.
/// Failure is opaque — the core does not distinguish an unknown user from a
/// wrong secret.
pub trait Authenticator: Send + Sync {
  fn verify<'a>(
    &'a self,
    credential: &'a Credential,
  ) -> impl Future<Output = Option<String>> + Send + 'a;
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Receipt for an accepted update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
  pub surveyor_id: String,
  /// Store-assigned id of the persisted sample.
  pub sample_id:   i64,
  /// Subscribers the update was handed to at publish time.
  pub delivered:   usize,
}

#[derive(Debug, Error)]
pub enum IngestError<E: std::error::Error + 'static> {
  /// Credential rejected, or the payload names a different surveyor than
  /// the one authenticated. No state was mutated.
  #[error("unauthorized")]
  Unauthorized,

  /// Malformed payload. No state was mutated.
  #[error("invalid input: {0}")]
  InvalidInput(#[from] crate::Error),

  /// Persistence failed after the broadcast already went out. Live
  /// subscribers saw the update; history did not record it. Not retried
  /// here — retry policy belongs to the caller.
  #[error("store failure: {0}")]
  StoreFailure(#[source] E),
}

// ─── Ingestor ────────────────────────────────────────────────────────────────

/// Receives location updates and drives them through authentication,
/// validation, presence, fan-out, and persistence.
pub struct Ingestor<S, A> {
  clock:  Arc<PresenceClock>,
  fanout: Arc<Fanout>,
  store:  Arc<S>,
  auth:   Arc<A>,
}

impl<S, A> Ingestor<S, A>
where
  S: TrackStore,
  A: Authenticator,
{
  pub fn new(
    clock: Arc<PresenceClock>,
    fanout: Arc<Fanout>,
    store: Arc<S>,
    auth: Arc<A>,
  ) -> Self {
    Self { clock, fanout, store, auth }
  }

  /// Ingest one update on behalf of `credential` at instant `now`.
  ///
  /// The authenticated surveyor must be the one named in the payload;
  /// a mismatch is rejected before any mutation.
  pub async fn ingest(
    &self,
    update: LiveUpdate,
    credential: &Credential,
    now: DateTime<Utc>,
  ) -> Result<Ack, IngestError<S::Error>> {
    let caller_id = self
      .auth
      .verify(credential)
      .await
      .ok_or(IngestError::Unauthorized)?;

    update.validate()?;

    if caller_id != update.surveyor_id {
      return Err(IngestError::Unauthorized);
    }

    self.clock.touch(&caller_id, now);

    let delivered = self.fanout.publish(&update);

    let sample = self
      .store
      .append(update.into())
      .await
      .map_err(IngestError::StoreFailure)?;

    Ok(Ack {
      surveyor_id: sample.surveyor_id,
      sample_id: sample.sample_id,
      delivered,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::TimeZone;
  use thiserror::Error;

  use super::*;
  use crate::sample::{LocationSample, NewSample};

  #[derive(Debug, Error)]
  #[error("disk full")]
  struct DiskFull;

  /// Records appends; can be switched to fail every append.
  #[derive(Default)]
  struct RecordingStore {
    samples:      Mutex<Vec<LocationSample>>,
    fail_appends: bool,
  }

  impl RecordingStore {
    fn failing() -> Self {
      Self { fail_appends: true, ..Self::default() }
    }

    fn appended(&self) -> usize {
      self.samples.lock().unwrap().len()
    }
  }

  impl TrackStore for RecordingStore {
    type Error = DiskFull;

    async fn append(
      &self,
      sample: NewSample,
    ) -> Result<LocationSample, Self::Error> {
      if self.fail_appends {
        return Err(DiskFull);
      }
      let mut samples = self.samples.lock().unwrap();
      let persisted = LocationSample {
        sample_id:   samples.len() as i64 + 1,
        surveyor_id: sample.surveyor_id,
        latitude:    sample.latitude,
        longitude:   sample.longitude,
        timestamp:   sample.timestamp,
        geom:        sample.geom,
      };
      samples.push(persisted.clone());
      Ok(persisted)
    }

    async fn latest(
      &self,
      surveyor_id: &str,
    ) -> Result<Option<LocationSample>, Self::Error> {
      let samples = self.samples.lock().unwrap();
      Ok(
        samples
          .iter()
          .filter(|s| s.surveyor_id == surveyor_id)
          .max_by_key(|s| (s.timestamp, s.sample_id))
          .cloned(),
      )
    }

    async fn range(
      &self,
      _surveyor_id: &str,
      _start: DateTime<Utc>,
      _end: DateTime<Utc>,
    ) -> Result<Vec<LocationSample>, Self::Error> {
      Ok(Vec::new())
    }

    async fn history(
      &self,
      _surveyor_id: &str,
    ) -> Result<Vec<LocationSample>, Self::Error> {
      Ok(Vec::new())
    }
  }

  /// Accepts exactly `surv1:gps`, resolving to SURV001.
  struct FixedAuth;

  impl Authenticator for FixedAuth {
    async fn verify(&self, credential: &Credential) -> Option<String> {
      (credential.username == "surv1" && credential.password == "gps")
        .then(|| "SURV001".to_string())
    }
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 30, 12, 0, 0).unwrap()
  }

  fn good_update() -> LiveUpdate {
    LiveUpdate {
      surveyor_id: "SURV001".into(),
      latitude:    40.0,
      longitude:   -73.0,
      timestamp:   now(),
    }
  }

  fn good_credential() -> Credential {
    Credential { username: "surv1".into(), password: "gps".into() }
  }

  struct Fixture {
    clock:    Arc<PresenceClock>,
    fanout:   Arc<Fanout>,
    store:    Arc<RecordingStore>,
    ingestor: Ingestor<RecordingStore, FixedAuth>,
  }

  fn fixture(store: RecordingStore) -> Fixture {
    let clock = Arc::new(PresenceClock::new());
    let fanout = Arc::new(Fanout::new());
    let store = Arc::new(store);
    let ingestor = Ingestor::new(
      clock.clone(),
      fanout.clone(),
      store.clone(),
      Arc::new(FixedAuth),
    );
    Fixture { clock, fanout, store, ingestor }
  }

  #[tokio::test]
  async fn accepted_update_touches_persists_and_broadcasts() {
    let f = fixture(RecordingStore::default());
    let mut sub = f.fanout.subscribe("SURV001");

    let ack = f
      .ingestor
      .ingest(good_update(), &good_credential(), now())
      .await
      .unwrap();

    assert_eq!(ack.surveyor_id, "SURV001");
    assert_eq!(ack.delivered, 1);
    assert_eq!(f.clock.last_activity("SURV001"), Some(now()));
    assert_eq!(f.store.appended(), 1);
    assert_eq!(sub.recv().await.unwrap(), good_update());

    let persisted = f.store.latest("SURV001").await.unwrap().unwrap();
    assert_eq!(persisted.sample_id, ack.sample_id);
    assert_eq!(persisted.timestamp, now());
    assert!(persisted.geom.is_none());
  }

  #[tokio::test]
  async fn bad_credential_mutates_nothing() {
    let f = fixture(RecordingStore::default());
    let mut sub = f.fanout.subscribe("SURV001");
    let credential =
      Credential { username: "surv1".into(), password: "wrong".into() };

    let result = f.ingestor.ingest(good_update(), &credential, now()).await;

    assert!(matches!(result, Err(IngestError::Unauthorized)));
    assert_eq!(f.clock.last_activity("SURV001"), None);
    assert_eq!(f.store.appended(), 0);
    // Nothing was broadcast either.
    f.fanout.publish(&good_update());
    assert_eq!(sub.recv().await.unwrap(), good_update());
  }

  #[tokio::test]
  async fn payload_for_another_surveyor_is_rejected() {
    let f = fixture(RecordingStore::default());
    let mut update = good_update();
    update.surveyor_id = "SURV002".into();

    let result = f.ingestor.ingest(update, &good_credential(), now()).await;

    assert!(matches!(result, Err(IngestError::Unauthorized)));
    assert_eq!(f.clock.last_activity("SURV001"), None);
    assert_eq!(f.store.appended(), 0);
  }

  #[tokio::test]
  async fn invalid_coordinates_are_rejected_before_mutation() {
    let f = fixture(RecordingStore::default());
    let mut update = good_update();
    update.latitude = 95.0;

    let result = f.ingestor.ingest(update, &good_credential(), now()).await;

    assert!(matches!(result, Err(IngestError::InvalidInput(_))));
    assert_eq!(f.clock.last_activity("SURV001"), None);
    assert_eq!(f.store.appended(), 0);
  }

  #[tokio::test]
  async fn store_failure_still_reaches_subscribers() {
    let f = fixture(RecordingStore::failing());
    let mut sub = f.fanout.subscribe("SURV001");

    let result = f
      .ingestor
      .ingest(good_update(), &good_credential(), now())
      .await;

    assert!(matches!(result, Err(IngestError::StoreFailure(_))));
    // The broadcast happened before the append failed.
    assert_eq!(sub.recv().await.unwrap(), good_update());
    // And the activity signal stuck.
    assert_eq!(f.clock.last_activity("SURV001"), Some(now()));
  }
}
