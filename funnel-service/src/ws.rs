use axum::{
    Json,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use funnel_flow::{QuizEvent, QuizView};
use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{info, warn};

use crate::api::{ApiError, AppState, funnel_error, parse_session_id};

/// Push every view rendered for the session, starting with the current one.
/// Clients may send quiz events as JSON text frames over the same socket.
pub async fn session_socket(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    parse_session_id(&session_id)?;
    state.runner.view(&session_id).await.map_err(funnel_error)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, session_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (mut sender, mut receiver) = socket.split();

    // subscribe before reading the current view so nothing falls in between
    let mut views = state.views.subscribe();
    let current = match state.runner.view(&session_id).await {
        Ok(view) => view,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Session vanished before socket opened");
            return;
        }
    };
    if send_view(&mut sender, &current).await.is_err() {
        return;
    }
    info!(session_id = %session_id, "WebSocket connected");

    let (rejections, mut rejected) = mpsc::unbounded_channel::<Value>();

    // task: forward this session's views and rejected events to the client
    let watched = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                received = views.recv() => match received {
                    Ok(rendered) if rendered.session_id == watched => {
                        if send_view(&mut sender, &rendered.view).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(session_id = %watched, skipped, "View stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(frame) = rejected.recv() => {
                    if sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // task: apply client events
    let runner = state.runner.clone();
    let target = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let refusal = match serde_json::from_str::<QuizEvent>(text.as_str()) {
                Ok(event) if event.is_timer() => {
                    warn!(session_id = %target, "Client sent a timer event, refusing");
                    error_frame((
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": "Timer events are issued by the server" })),
                    ))
                }
                Ok(event) => match runner.dispatch(&target, event).await {
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(session_id = %target, error = %e, "Client event failed");
                        error_frame(funnel_error(e))
                    }
                },
                Err(e) => {
                    warn!(session_id = %target, error = %e, "Malformed client message");
                    error_frame((
                        StatusCode::UNPROCESSABLE_ENTITY,
                        Json(json!({ "error": format!("Malformed event: {e}") })),
                    ))
                }
            };
            if rejections.send(refusal).is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!(session_id = %session_id, "WebSocket closed");
}

/// Body of a refused event as sent over the socket, with the HTTP status the
/// same event would have earned on the REST endpoint.
fn error_frame((status, Json(mut body)): ApiError) -> Value {
    body["status"] = json!(status.as_u16());
    body
}

async fn send_view<S>(sender: &mut S, view: &QuizView) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(view).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
