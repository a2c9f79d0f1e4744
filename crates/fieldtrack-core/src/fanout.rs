//! Broadcast fan-out — a publish-subscribe registry keyed by surveyor id.
//!
//! Each surveyor id maps to a bounded broadcast channel. A publish delivers
//! to every subscriber registered on that channel at call time; there is no
//! replay buffer, so a subscription only ever sees updates published after
//! it was created. Delivery is best-effort: a subscriber that falls more
//! than the channel capacity behind loses the oldest updates (it observes a
//! `Lagged` error) without ever blocking the publisher or other subscribers.

use dashmap::DashMap;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;

use crate::sample::LiveUpdate;

/// Per-channel buffer size. A subscriber further behind than this starts
/// losing the oldest updates.
const CHANNEL_CAPACITY: usize = 100;

// ─── Registry ────────────────────────────────────────────────────────────────

/// Publish-subscribe registry for live location updates.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Debug, Default)]
pub struct Fanout {
  channels: DashMap<String, broadcast::Sender<LiveUpdate>>,
}

impl Fanout {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a subscriber on the surveyor's channel.
  ///
  /// Dropping the returned [`Subscription`] unsubscribes.
  pub fn subscribe(&self, surveyor_id: &str) -> Subscription {
    let receiver = self
      .channels
      .entry(surveyor_id.to_owned())
      .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
      .subscribe();
    Subscription { receiver }
  }

  /// Deliver `update` to every current subscriber of its surveyor's channel.
  ///
  /// Returns the number of subscribers the update was handed to; zero when
  /// nobody is listening (the update is discarded silently, matching the
  /// no-replay contract). A channel left without subscribers is pruned so
  /// the registry stays bounded by the set of watched surveyors.
  pub fn publish(&self, update: &LiveUpdate) -> usize {
    let delivered = match self.channels.get(&update.surveyor_id) {
      Some(sender) => sender.send(update.clone()).unwrap_or(0),
      None => return 0,
    };

    if delivered == 0 {
      // Guard re-checks under the write lock, so a subscriber that raced in
      // after the failed send keeps its channel.
      self
        .channels
        .remove_if(&update.surveyor_id, |_, sender| sender.receiver_count() == 0);
    }
    delivered
  }

  /// Current subscriber count for a surveyor's channel.
  pub fn subscriber_count(&self, surveyor_id: &str) -> usize {
    self
      .channels
      .get(surveyor_id)
      .map(|sender| sender.receiver_count())
      .unwrap_or(0)
  }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// A live handle on one surveyor's channel. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
  receiver: broadcast::Receiver<LiveUpdate>,
}

impl Subscription {
  /// Wait for the next update published to this channel.
  ///
  /// `Err(RecvError::Lagged(n))` means this subscriber fell behind and `n`
  /// updates were dropped for it; subsequent calls resume with the oldest
  /// retained update.
  pub async fn recv(&mut self) -> Result<LiveUpdate, RecvError> {
    self.receiver.recv().await
  }
}
