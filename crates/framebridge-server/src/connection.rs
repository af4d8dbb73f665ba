//! One WebSocket connection.
//!
//! A connection greets the client, then processes frames strictly in arrival
//! order. Commands and their results are relayed to every other open
//! connection, never echoed back.

use crate::handler::{Outcome, process_frame};
use crate::server::{AppState, shutdown_requested};
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, close_code};
use framebridge_core::Message;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Greeting sent as the first frame of every connection.
pub const CONNECTED_MESSAGE: &str = "Successfully connected to server";

type WsSink = SplitSink<WebSocket, WsMessage>;

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgraded, greeting not yet sent.
    Open,
    /// Greeted and processing frames.
    Active,
    /// Finished; no further frames are processed.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Open => "open",
            ConnectionState::Active => "active",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Drive one upgraded socket until either side closes it.
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let id = Uuid::new_v4();
    let _alive = state.alive_token();
    let mut relay_rx = state.relay.subscribe();
    let stop = shutdown_requested(state.shutdown.clone());
    tokio::pin!(stop);

    state.transition(id, ConnectionState::Open);
    info!("New connection: {}", id);

    let (mut sender, mut receiver) = socket.split();
    let greeting = Message::Connected {
        message: CONNECTED_MESSAGE.to_string(),
    };
    if send(&mut sender, &greeting).await {
        state.transition(id, ConnectionState::Active);

        loop {
            tokio::select! {
                msg = receiver.next() => {
                    let frame = match msg {
                        Some(Ok(WsMessage::Text(text))) => text.as_str().as_bytes().to_vec(),
                        Some(Ok(WsMessage::Binary(data))) => data.to_vec(),
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(_)) => continue, // ping/pong
                        Some(Err(e)) => {
                            warn!("WebSocket error for {}: {}", id, e);
                            break;
                        }
                    };
                    match process_frame(state.store.as_ref(), &frame).await {
                        Outcome::Reply(reply) => {
                            if !send(&mut sender, &reply).await {
                                break;
                            }
                        }
                        Outcome::Relay(msg) => {
                            debug!("Relaying {} from {}", msg.kind(), id);
                            // Our own receiver is subscribed, so this cannot fail.
                            let _ = state.relay.send((id, msg));
                        }
                        Outcome::Nothing => {}
                    }
                }

                relayed = relay_rx.recv() => {
                    match relayed {
                        Ok((from, msg)) if from != id => {
                            if !send(&mut sender, &msg).await {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Connection {} missed {} relayed messages", id, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                _ = &mut stop => {
                    let close = CloseFrame {
                        code: close_code::AWAY,
                        reason: "Server shutting down".into(),
                    };
                    let _ = sender.send(WsMessage::Close(Some(close))).await;
                    break;
                }
            }
        }
    }

    state.transition(id, ConnectionState::Closed);
    info!("Connection closed: {}", id);
}

/// Send one message. Returns false once the socket is unusable.
async fn send(sender: &mut WsSink, msg: &Message) -> bool {
    let json = match msg.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode {}: {}", msg.kind(), e);
            return true;
        }
    };
    sender.send(WsMessage::Text(json.into())).await.is_ok()
}
