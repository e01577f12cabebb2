//! WebSocket channel for driving and observing one interview.
//!
//! A client connects to `/ws/interview/:session_id` and receives a
//! `connected` event with the session state. It may then send JSON messages:
//!
//! - `{"type":"answer","text":"..."}` - submit an answer
//! - `{"type":"end"}` - end the interview
//! - `{"type":"state"}` - request the current state
//! - `{"type":"audio","data":"<base64>","format":"wav"}` - recorded audio
//!
//! Progress is delivered as [`InterviewEvent`]s. Events caused by HTTP calls
//! on the same session are forwarded too. Failures are sent only to the
//! client that caused them.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::audio::{self, AudioFormat};
use crate::events::InterviewEvent;
use crate::service::InterviewService;

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum number of missed pong responses before disconnecting.
const MAX_MISSED_PONGS: u8 = 3;

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit an answer to the current question.
    Answer {
        /// The answer text.
        text: String,
    },
    /// End the interview.
    End,
    /// Request the current state.
    State,
    /// Recorded audio of an answer.
    Audio {
        /// Base64 audio, optionally as a `data:` URL.
        data: String,
        /// Container format.
        #[serde(default)]
        format: Option<String>,
    },
}

type WsSender = SplitSink<WebSocket, Message>;

/// WebSocket upgrade handler for `/ws/interview/:session_id`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!(session_id = %session_id, "New WebSocket connection request");
    let service = Arc::clone(&state.service);
    ws.on_upgrade(move |socket| handle_socket(socket, service, session_id))
}

/// Serializes and sends one event. Returns `false` once the client is gone.
async fn send_event(sender: &mut WsSender, event: &InterviewEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(event = event.event_name(), error = %e, "Failed to serialize event");
            return true;
        }
    };
    sender.send(Message::Text(json)).await.is_ok()
}

/// Handles a single WebSocket connection.
///
/// - Sends `connected` with the session state, or `error` and closes if the
///   session does not exist
/// - Forwards broadcast events for this session
/// - Runs client commands against the service
/// - Sends heartbeat pings and closes after 3 missed pongs
async fn handle_socket(socket: WebSocket, service: Arc<InterviewService>, session_id: String) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading state so no event slips between the two
    let mut event_receiver = service.events().subscribe();

    let connected = match service.get_state(&session_id).await {
        Ok(state) => InterviewEvent::connected(state),
        Err(e) => {
            let _ = send_event(
                &mut sender,
                &InterviewEvent::error(Some(session_id.clone()), e.to_string()),
            )
            .await;
            let _ = sender.send(Message::Close(None)).await;
            debug!(session_id = %session_id, "Rejected WebSocket for unknown session");
            return;
        }
    };
    if !send_event(&mut sender, &connected).await {
        debug!("Client disconnected before receiving connected event");
        return;
    }
    info!(session_id = %session_id, "WebSocket client connected, sent initial state");

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed_pongs = 0u8;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&service, &session_id, &text).await {
                            if !send_event(&mut sender, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                        debug!("Received pong from client");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary message from client");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(session_id = %session_id, "Client requested close");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket error");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            event = event_receiver.recv() => {
                match event {
                    Ok(event) if event.session_id() == Some(session_id.as_str()) => {
                        if !send_event(&mut sender, &event).await {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(session_id = %session_id, missed = n, "Client lagged behind events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcaster closed");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
                missed_pongs += 1;
                if missed_pongs >= MAX_MISSED_PONGS {
                    info!(session_id = %session_id, "Client missed {} pongs, closing connection", MAX_MISSED_PONGS);
                    break;
                }
            }
        }
    }

    info!(session_id = %session_id, "WebSocket client disconnected");
}

/// Runs one client command.
///
/// Returns an event for this client only. Successful answers and endings
/// reach the client through the broadcaster instead.
async fn handle_client_message(
    service: &InterviewService,
    session_id: &str,
    text: &str,
) -> Option<InterviewEvent> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return Some(InterviewEvent::error(
                Some(session_id.to_string()),
                format!("Unrecognized message: {e}"),
            ));
        }
    };

    let failed = |e: crate::InterviewError| {
        Some(InterviewEvent::error(Some(session_id.to_string()), e.to_string()))
    };

    match message {
        ClientMessage::Answer { text } => service
            .submit_answer(session_id, &text)
            .await
            .err()
            .and_then(failed),
        ClientMessage::End => service.end_session(session_id).await.err().and_then(failed),
        ClientMessage::State => match service.get_state(session_id).await {
            Ok(state) => Some(InterviewEvent::state(state)),
            Err(e) => failed(e),
        },
        ClientMessage::Audio { data, format } => {
            let format = format
                .as_deref()
                .and_then(AudioFormat::from_str_case_insensitive)
                .unwrap_or_default();
            match audio::decode(&data) {
                Ok(bytes) => {
                    debug!(session_id, bytes = bytes.len(), %format, "Received audio frame");
                    Some(InterviewEvent::error(
                        Some(session_id.to_string()),
                        "Speech-to-text is not available; send the transcribed answer as text",
                    ))
                }
                Err(e) => failed(e),
            }
        }
    }
}
