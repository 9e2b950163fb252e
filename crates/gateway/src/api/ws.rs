//! WebSocket endpoint for operator chat.
//!
//! Flow:
//! 1. Client connects to `/ws`
//! 2. A reader task forwards text frames into a bounded channel
//! 3. The processing loop dispatches them strictly in order, one reply
//!    (or one close) per frame
//! 4. When the client goes away the connection token is cancelled and
//!    any in-flight message is abandoned without a reply

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use rh_domain::trace::TraceEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Outcome;
use crate::state::AppState;

/// GET /ws: upgrade to WebSocket.
pub async fn request_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Socket handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = uuid::Uuid::new_v4().to_string();
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (frames_tx, mut frames_rx) = mpsc::channel::<String>(state.config.server.frame_buffer.max(1));
    let connection = CancellationToken::new();

    tracing::info!(connection_id = %connection_id, "client connected");

    // Reader task: forwards inbound text frames; cancels the connection
    // token when the stream ends.
    let reader = {
        let connection = connection.clone();
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = ws_stream.next().await {
                match msg {
                    Message::Text(text) => {
                        TraceEvent::MessageReceived {
                            connection_id: connection_id.clone(),
                            bytes: text.len(),
                        }
                        .emit();
                        if frames_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    // axum answers pings itself.
                    Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
                }
            }
            connection.cancel();
        })
    };

    // Processing loop: one message at a time, in arrival order.
    while let Some(text) = frames_rx.recv().await {
        let message = connection.child_token();
        match state.dispatcher.handle(&text, &message).await {
            Outcome::Reply(frame) => {
                if ws_sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            Outcome::Close { code, reason } => {
                let _ = ws_sink
                    .send(Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })))
                    .await;
                break;
            }
            Outcome::Cancelled => break,
        }
    }

    connection.cancel();
    reader.abort();
    tracing::info!(connection_id = %connection_id, "client disconnected");
}
