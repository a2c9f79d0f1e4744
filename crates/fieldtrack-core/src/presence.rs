//! Presence tracking — the in-memory liveness clock and the online/offline
//! resolver.
//!
//! The clock is a process-scoped concurrent map from surveyor id to the last
//! observed activity instant. It is rebuilt from zero on process restart:
//! until the next activity signal arrives, the resolver sees every surveyor
//! as offline unless a fresh-enough persisted sample says otherwise.
//!
//! Every instant is passed in by the caller rather than read from a wall
//! clock, so both components are deterministic under test.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::store::TrackStore;

/// Default liveness window: an activity signal older than this no longer
/// counts as "online."
pub const DEFAULT_LIVENESS_WINDOW_SECS: i64 = 5 * 60;

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Last-activity instants, keyed by surveyor id.
///
/// Backed by a sharded concurrent map: concurrent `touch` calls for
/// different ids never contend on a common lock, and a read for an id never
/// observes a value older than the most recently completed `touch` for it.
/// Entries are never evicted — growth is bounded by the surveyor population,
/// not by event volume.
#[derive(Debug, Default)]
pub struct PresenceClock {
  entries: DashMap<String, DateTime<Utc>>,
}

impl PresenceClock {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record `at` as the surveyor's last-activity instant, overwriting any
  /// prior value.
  pub fn touch(&self, surveyor_id: &str, at: DateTime<Utc>) {
    self.entries.insert(surveyor_id.to_owned(), at);
  }

  /// The most recent recorded instant, or `None` if never touched.
  pub fn last_activity(&self, surveyor_id: &str) -> Option<DateTime<Utc>> {
    self.entries.get(surveyor_id).map(|entry| *entry.value())
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Combines the [`PresenceClock`] with the most recent persisted sample to
/// produce an online/offline verdict.
///
/// Either signal alone marks a surveyor online: the two are produced by
/// different code paths (explicit activity pings vs. GPS uploads) and one
/// failing to fire must not mark a genuinely active surveyor offline.
pub struct PresenceResolver<S> {
  clock:  Arc<PresenceClock>,
  store:  Arc<S>,
  window: Duration,
}

impl<S: TrackStore> PresenceResolver<S> {
  /// Build a resolver with the default five-minute window.
  pub fn new(clock: Arc<PresenceClock>, store: Arc<S>) -> Self {
    Self {
      clock,
      store,
      window: Duration::seconds(DEFAULT_LIVENESS_WINDOW_SECS),
    }
  }

  pub fn with_window(mut self, window: Duration) -> Self {
    self.window = window;
    self
  }

  pub fn window(&self) -> Duration {
    self.window
  }

  /// `true` iff the surveyor produced an activity signal (ping or sample)
  /// within the window ending at `now`.
  pub async fn is_online(
    &self,
    surveyor_id: &str,
    now: DateTime<Utc>,
  ) -> Result<bool, S::Error> {
    let via_clock = self
      .clock
      .last_activity(surveyor_id)
      .is_some_and(|at| now - at <= self.window);
    if via_clock {
      return Ok(true);
    }

    let via_track = self
      .store
      .latest(surveyor_id)
      .await?
      .is_some_and(|sample| now - sample.timestamp <= self.window);
    Ok(via_track)
  }

  /// Evaluate every id against the single `now` snapshot, so no entry in
  /// one response is judged at a different instant than another.
  pub async fn statuses<I>(
    &self,
    ids: I,
    now: DateTime<Utc>,
  ) -> Result<HashMap<String, bool>, S::Error>
  where
    I: IntoIterator<Item = String>,
  {
    let mut statuses = HashMap::new();
    for id in ids {
      let online = self.is_online(&id, now).await?;
      statuses.insert(id, online);
    }
    Ok(statuses)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::TimeZone;

  use super::*;
  use crate::sample::{LocationSample, NewSample};

  /// In-memory track store; append order doubles as insertion order.
  #[derive(Default)]
  struct MemStore {
    samples: Mutex<Vec<LocationSample>>,
  }

  impl MemStore {
    fn push(&self, surveyor_id: &str, timestamp: DateTime<Utc>) {
      let mut samples = self.samples.lock().unwrap();
      let sample_id = samples.len() as i64 + 1;
      samples.push(LocationSample {
        sample_id,
        surveyor_id: surveyor_id.to_owned(),
        latitude: 0.0,
        longitude: 0.0,
        timestamp,
        geom: None,
      });
    }
  }

  impl TrackStore for MemStore {
    type Error = std::convert::Infallible;

    async fn append(
      &self,
      sample: NewSample,
    ) -> Result<LocationSample, Self::Error> {
      self.push(&sample.surveyor_id, sample.timestamp);
      Ok(self.samples.lock().unwrap().last().unwrap().clone())
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
      surveyor_id: &str,
      start: DateTime<Utc>,
      end: DateTime<Utc>,
    ) -> Result<Vec<LocationSample>, Self::Error> {
      let samples = self.samples.lock().unwrap();
      let mut hits: Vec<_> = samples
        .iter()
        .filter(|s| {
          s.surveyor_id == surveyor_id
            && s.timestamp >= start
            && s.timestamp <= end
        })
        .cloned()
        .collect();
      hits.sort_by_key(|s| (s.timestamp, s.sample_id));
      Ok(hits)
    }

    async fn history(
      &self,
      surveyor_id: &str,
    ) -> Result<Vec<LocationSample>, Self::Error> {
      let samples = self.samples.lock().unwrap();
      let mut hits: Vec<_> = samples
        .iter()
        .filter(|s| s.surveyor_id == surveyor_id)
        .cloned()
        .collect();
      hits.sort_by_key(|s| (s.timestamp, s.sample_id));
      Ok(hits)
    }
  }

  fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 30, h, m, s).unwrap()
  }

  fn resolver(store: Arc<MemStore>) -> PresenceResolver<MemStore> {
    PresenceResolver::new(Arc::new(PresenceClock::new()), store)
  }

  #[tokio::test]
  async fn never_seen_is_offline() {
    let r = resolver(Arc::new(MemStore::default()));
    assert!(!r.is_online("SURV001", at(12, 0, 0)).await.unwrap());
  }

  #[tokio::test]
  async fn touch_marks_online_immediately() {
    let clock = Arc::new(PresenceClock::new());
    let r = PresenceResolver::new(clock.clone(), Arc::new(MemStore::default()));
    let now = at(12, 0, 0);
    clock.touch("SURV001", now);
    assert!(r.is_online("SURV001", now).await.unwrap());
  }

  #[tokio::test]
  async fn clock_signal_expires_after_window() {
    let clock = Arc::new(PresenceClock::new());
    let r = PresenceResolver::new(clock.clone(), Arc::new(MemStore::default()));
    clock.touch("SURV001", at(12, 0, 0));

    // 4:59 in — still online; 5:01 in — offline, and stays offline.
    assert!(r.is_online("SURV001", at(12, 4, 59)).await.unwrap());
    assert!(r.is_online("SURV001", at(12, 5, 0)).await.unwrap());
    assert!(!r.is_online("SURV001", at(12, 5, 1)).await.unwrap());
    assert!(!r.is_online("SURV001", at(13, 0, 0)).await.unwrap());
  }

  #[tokio::test]
  async fn fresh_sample_alone_marks_online() {
    let store = Arc::new(MemStore::default());
    store.push("SURV001", at(12, 0, 0));
    let r = resolver(store);

    assert!(r.is_online("SURV001", at(12, 4, 59)).await.unwrap());
    assert!(!r.is_online("SURV001", at(12, 5, 1)).await.unwrap());
  }

  #[tokio::test]
  async fn stale_sample_with_fresh_touch_is_online() {
    let store = Arc::new(MemStore::default());
    store.push("SURV001", at(11, 0, 0));
    let clock = Arc::new(PresenceClock::new());
    let r = PresenceResolver::new(clock.clone(), store);

    let now = at(12, 0, 0);
    assert!(!r.is_online("SURV001", now).await.unwrap());
    clock.touch("SURV001", now);
    assert!(r.is_online("SURV001", now).await.unwrap());
  }

  #[tokio::test]
  async fn touch_overwrites_older_instant() {
    let clock = PresenceClock::new();
    clock.touch("SURV001", at(11, 0, 0));
    clock.touch("SURV001", at(12, 0, 0));
    assert_eq!(clock.last_activity("SURV001"), Some(at(12, 0, 0)));
  }

  #[tokio::test]
  async fn statuses_use_one_now_snapshot() {
    let clock = Arc::new(PresenceClock::new());
    let store = Arc::new(MemStore::default());
    store.push("SURV002", at(11, 58, 0));
    let r = PresenceResolver::new(clock.clone(), store);

    clock.touch("SURV001", at(11, 50, 0)); // stale by 12:00
    let statuses = r
      .statuses(
        vec![
          "SURV001".to_string(),
          "SURV002".to_string(),
          "SURV003".to_string(),
        ],
        at(12, 0, 0),
      )
      .await
      .unwrap();

    assert_eq!(statuses.get("SURV001"), Some(&false));
    assert_eq!(statuses.get("SURV002"), Some(&true));
    assert_eq!(statuses.get("SURV003"), Some(&false));
  }

  #[tokio::test]
  async fn custom_window_is_respected() {
    let clock = Arc::new(PresenceClock::new());
    let r = PresenceResolver::new(clock.clone(), Arc::new(MemStore::default()))
      .with_window(Duration::seconds(30));
    clock.touch("SURV001", at(12, 0, 0));

    assert!(r.is_online("SURV001", at(12, 0, 30)).await.unwrap());
    assert!(!r.is_online("SURV001", at(12, 0, 31)).await.unwrap());
  }
}
