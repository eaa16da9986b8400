use crate::core::reload::ReloadMessage;
use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::{AggregatedMessage, MessageStream, Session};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::interval;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// A client that has not answered a ping for this long is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// The text frame the browser script acts on.
fn frame_for(message: &ReloadMessage) -> &'static str {
  match message {
    ReloadMessage::Reload(_) => "reload",
    ReloadMessage::ReloadCss => "reload-css",
  }
}

/// Upgrades the request and hands the session to its own task.
pub(crate) async fn websocket_handler(
  req: HttpRequest,
  body: web::Payload,
  broadcaster: broadcast::Sender<ReloadMessage>,
) -> Result<HttpResponse, actix_web::Error> {
  log::debug!("New live-reload WebSocket connection from {:?}", req.peer_addr());

  let (response, session, msg_stream) = actix_ws::handle(&req, body)?;
  actix_web::rt::spawn(run_session(session, msg_stream, broadcaster.subscribe()));
  Ok(response)
}

async fn run_session(
  mut session: Session,
  msg_stream: MessageStream,
  mut changes: broadcast::Receiver<ReloadMessage>,
) {
  let mut last_heartbeat = Instant::now();
  let mut heartbeat = interval(HEARTBEAT_INTERVAL);
  let mut msg_stream = msg_stream.aggregate_continuations();

  let close_reason = loop {
    tokio::select! {
      _ = heartbeat.tick() => {
        if last_heartbeat.elapsed() > CLIENT_TIMEOUT {
          log::info!("Live-reload client stopped answering pings, disconnecting");
          break None;
        }
        if session.ping(b"").await.is_err() {
          break None;
        }
      }

      incoming = msg_stream.next() => {
        match incoming {
          Some(Ok(AggregatedMessage::Ping(bytes))) => {
            last_heartbeat = Instant::now();
            if session.pong(&bytes).await.is_err() {
              break None;
            }
          }
          Some(Ok(AggregatedMessage::Pong(_))) => last_heartbeat = Instant::now(),
          Some(Ok(AggregatedMessage::Close(reason))) => break reason,
          // The browser only listens.
          Some(Ok(AggregatedMessage::Text(_) | AggregatedMessage::Binary(_))) => {}
          Some(Err(e)) => {
            log::debug!("Live-reload WebSocket protocol error: {}", e);
            break None;
          }
          None => break None,
        }
      }

      change = changes.recv() => {
        let frame = match change {
          Ok(message) => frame_for(&message),
          // Missed changes still mean the page is out of date.
          Err(RecvError::Lagged(skipped)) => {
            log::debug!("Live-reload client lagged behind by {} changes", skipped);
            "reload"
          }
          Err(RecvError::Closed) => break None,
        };
        log::debug!("Sending '{}' to live-reload client", frame);
        if session.text(frame).await.is_err() {
          break None;
        }
      }
    }
  };

  let _ = session.close(close_reason).await;
}
