//! Manages the WebSocket connection lifecycle for an interview session.

use super::{
    protocol::{ClientMessage, ServerMessage},
    registry::SharedSession,
};
use crate::{
    auth::{self, AuthError, AuthUser},
    models::ErrorResponse,
    state::AppState,
};
use anyhow::Result;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use intervu_core::session::{InterviewSession, StartError};
use intervu_core::topic::TopicRef;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
///
/// Authentication happens here, before any session exists: the bearer token
/// (from the `Authorization` header, or a `token` query parameter for
/// browser clients that cannot set headers on upgrade requests) is verified
/// against the identity provider. Invalid credentials never upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let token = auth::bearer_token(&headers)
        .map(str::to_string)
        .or_else(|| params.get("token").cloned());
    let Some(token) = token else {
        return unauthorized(AuthError::MissingToken.to_string());
    };

    match state.auth.verify(&token).await {
        Ok(user) => ws.on_upgrade(move |socket| handle_socket(socket, state, user)),
        Err(AuthError::Provider(e)) => {
            error!(error = ?e, "Identity provider unavailable during WS handshake");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    message: "An internal server error occurred.".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => unauthorized(e.to_string()),
    }
}

fn unauthorized(message: String) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse { message })).into_response()
}

/// Main loop for one authenticated WebSocket connection.
///
/// Messages are processed strictly one at a time: this loop is the
/// per-connection serialization point, and the session's own mutex guards
/// against any other path touching the same session concurrently.
#[instrument(name = "ws_session", skip_all, fields(conn_id, user_id = %user.id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthUser) {
    let conn_id: u32 = rand::random();
    tracing::Span::current().record("conn_id", conn_id);
    info!("WebSocket connected");

    let (mut socket_tx, mut socket_rx): (SplitSink<WebSocket, Message>, SplitStream<WebSocket>) =
        socket.split();
    let mut active: Option<(Uuid, SharedSession)> = None;

    while let Some(msg_result) = socket_rx.next().await {
        let ws_msg = match msg_result {
            Ok(m) => m,
            Err(e) => {
                error!(error = ?e, "Error receiving from client WebSocket");
                break;
            }
        };

        match ws_msg {
            Message::Text(text) => {
                let msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(m) => m,
                    Err(_) => {
                        warn!("Ignoring unrecognized client message");
                        let _ = send_msg(
                            &mut socket_tx,
                            ServerMessage::Error {
                                message: "Unrecognized message".to_string(),
                            },
                        )
                        .await;
                        continue;
                    }
                };

                // Any unexpected fault is reported to the client without
                // tearing down the connection or the process.
                if let Err(e) =
                    handle_client_message(msg, &state, &user, &mut active, &mut socket_tx).await
                {
                    error!(error = ?e, "Failed while handling client message");
                    let _ = send_msg(
                        &mut socket_tx,
                        ServerMessage::Error {
                            message: "Failed while processing message".to_string(),
                        },
                    )
                    .await;
                }
            }
            Message::Close(_) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Disconnect stops further emission; evict the session from the registry.
    if let Some((session_id, _)) = active.take() {
        state.registry.remove(session_id).await;
        info!(%session_id, "Session evicted from registry on disconnect");
    }
    info!("WebSocket connection closed");
}

/// Dispatches one parsed client message against the session state machine.
async fn handle_client_message(
    msg: ClientMessage,
    state: &Arc<AppState>,
    user: &AuthUser,
    active: &mut Option<(Uuid, SharedSession)>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
) -> Result<()> {
    match msg {
        ClientMessage::StartInterview {
            topic_id,
            topic_name,
        } => {
            if active.is_some() {
                send_msg(
                    socket_tx,
                    ServerMessage::Error {
                        message: "An interview is already in progress".to_string(),
                    },
                )
                .await?;
                return Ok(());
            }

            let topic_ref = TopicRef {
                id: topic_id,
                name: topic_name,
            };
            let started = InterviewSession::start(
                &user.id,
                &topic_ref,
                state.db.as_ref(),
                state.question_oracle.as_ref(),
                state.db.as_ref(),
            )
            .await;

            match started {
                Ok((session, events)) => {
                    let session_id = session.session_id();
                    let shared = state.registry.insert(session).await;
                    *active = Some((session_id, shared));
                    for event in events {
                        send_msg(socket_tx, ServerMessage::from(event)).await?;
                    }
                }
                Err(StartError::Topic(e)) => {
                    send_msg(
                        socket_tx,
                        ServerMessage::Error {
                            message: e.to_string(),
                        },
                    )
                    .await?;
                }
                Err(StartError::Store(e)) => {
                    error!(error = ?e, "Failed to persist new interview");
                    send_msg(
                        socket_tx,
                        ServerMessage::Error {
                            message: "Failed to start interview".to_string(),
                        },
                    )
                    .await?;
                }
            }
        }
        ClientMessage::SubmitAnswer { previous_answer } => {
            let Some((session_id, shared)) = active.as_ref() else {
                send_msg(
                    socket_tx,
                    ServerMessage::Error {
                        message: "No active interview".to_string(),
                    },
                )
                .await?;
                return Ok(());
            };
            let session_id = *session_id;

            let (events, terminal) = {
                let mut session = shared.lock().await;
                let events = session
                    .submit_answer(
                        previous_answer.as_deref().unwrap_or(""),
                        state.question_oracle.as_ref(),
                        state.evaluation_oracle.as_ref(),
                        state.db.as_ref(),
                    )
                    .await;
                (events, session.status().is_terminal())
            };

            for event in events {
                send_msg(socket_tx, ServerMessage::from(event)).await?;
            }

            if terminal {
                state.registry.remove(session_id).await;
                *active = None;
            }
        }
    }
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
