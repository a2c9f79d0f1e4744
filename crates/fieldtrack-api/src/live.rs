//! WebSocket endpoint for live location streaming.
//!
//! Clients connect to `/ws/location/:surveyor_id` and receive each accepted
//! update for that surveyor as a JSON text frame. The stream is one-way;
//! frames sent by the client are ignored. There is no replay — a client only
//! sees updates published after it connected.

use axum::{
  extract::{
    Path, State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use futures::{SinkExt as _, StreamExt as _};

use fieldtrack_core::{
  fanout::{RecvError, Subscription},
  store::{SurveyorStore, TrackStore},
};

use crate::AppState;

/// `GET /ws/location/:surveyor_id` — upgrade and stream.
pub async fn stream<S>(
  State(state): State<AppState<S>>,
  Path(surveyor_id): Path<String>,
  ws: WebSocketUpgrade,
) -> Response
where
  S: TrackStore + SurveyorStore + Send + Sync + 'static,
{
  // Subscribe before the upgrade completes so nothing published during the
  // handshake is missed.
  let subscription = state.fanout.subscribe(&surveyor_id);
  ws.on_upgrade(move |socket| forward(socket, subscription, surveyor_id))
}

/// Pump fan-out messages into the socket until either side goes away.
async fn forward(
  socket: WebSocket,
  mut subscription: Subscription,
  surveyor_id: String,
) {
  tracing::debug!(%surveyor_id, "live subscriber connected");
  let (mut sink, mut source) = socket.split();

  loop {
    tokio::select! {
      update = subscription.recv() => match update {
        Ok(update) => {
          let Ok(json) = serde_json::to_string(&update) else { continue };
          if sink.send(Message::Text(json.into())).await.is_err() {
            break;
          }
        }
        Err(RecvError::Lagged(dropped)) => {
          // Slow consumer: it lost `dropped` updates but stays connected.
          tracing::warn!(%surveyor_id, dropped, "live subscriber lagged");
        }
        Err(RecvError::Closed) => break,
      },

      frame = source.next() => match frame {
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
        Some(Ok(_)) => {} // inbound frames carry no meaning here
      },
    }
  }

  tracing::debug!(%surveyor_id, "live subscriber disconnected");
}
