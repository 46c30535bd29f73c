use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use funnel_flow::{FunnelError, FunnelRunner, Outcome, QuizEvent, QuizView, estimate, format_usd};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::{render::BroadcastRenderer, ws};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub runner: FunnelRunner,
    pub views: BroadcastRenderer,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub view: QuizView,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub session_id: String,
    pub outcome: Outcome,
    pub view: QuizView,
}

#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    pub property_value: u64,
    pub mortgage_balance: u64,
}

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// Map library errors onto HTTP statuses.
pub fn funnel_error(e: FunnelError) -> ApiError {
    match &e {
        FunnelError::SessionNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Session not found", "session_id": id })),
        ),
        FunnelError::EventNotAllowed { .. } => (
            StatusCode::CONFLICT,
            Json(json!({ "error": e.to_string() })),
        ),
        FunnelError::InvalidStep(_) | FunnelError::UnknownPropertyValue(_) => {
            bad_request_error(&e.to_string())
        }
        FunnelError::ConfigError(_) => {
            error!(error = %e, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal error", "details": e.to_string() })),
            )
        }
    }
}

pub fn parse_session_id(session_id: &str) -> Result<(), ApiError> {
    if Uuid::parse_str(session_id).is_err() {
        warn!(session_id = %session_id, "Invalid session ID format");
        return Err(bad_request_error("Invalid session ID format"));
    }
    Ok(())
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/estimate", get(estimate_cash))
        .route("/sessions", post(start_session))
        .route("/sessions/{id}", get(get_session).delete(end_session))
        .route("/sessions/{id}/events", post(post_event))
        .route("/sessions/{id}/reset", post(reset_session))
        .route("/sessions/{id}/ws", get(ws::session_socket))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn estimate_cash(Query(query): Query<EstimateQuery>) -> Json<Value> {
    let cash = estimate(query.property_value, query.mortgage_balance);
    Json(json!({
        "property_value": query.property_value,
        "mortgage_balance": query.mortgage_balance,
        "estimate": cash,
        "formatted": format_usd(cash)
    }))
}

async fn start_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let (session_id, view) = state.runner.start().await.map_err(funnel_error)?;
    info!(session_id = %session_id, "Created session");
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id, view })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    parse_session_id(&session_id)?;
    let view = state.runner.view(&session_id).await.map_err(funnel_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn post_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(event): Json<QuizEvent>,
) -> ApiResult<EventResponse> {
    parse_session_id(&session_id)?;
    if event.is_timer() {
        return Err(bad_request_error("Timer events are issued by the server"));
    }

    info!(session_id = %session_id, event = event.name(), "Processing event");
    let dispatched = state
        .runner
        .dispatch(&session_id, event)
        .await
        .map_err(funnel_error)?;

    Ok(Json(EventResponse {
        session_id,
        outcome: dispatched.outcome,
        view: dispatched.view,
    }))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    parse_session_id(&session_id)?;
    let view = state.runner.reset(&session_id).await.map_err(funnel_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    parse_session_id(&session_id)?;
    state.runner.end(&session_id).await.map_err(funnel_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use funnel_flow::{InMemorySessionStorage, Pacing};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let views = BroadcastRenderer::new(16);
        let (runner, timers) = FunnelRunner::new(
            Arc::new(InMemorySessionStorage::new()),
            Arc::new(views.clone()),
            Pacing::default(),
        );
        runner.spawn_timer_loop(timers);
        build_router(AppState { runner, views })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = call(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn estimate_endpoint() {
        let app = app();
        let (status, body) = call(
            &app,
            "GET",
            "/estimate?property_value=500000&mortgage_balance=200000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["estimate"], 200_000);
        assert_eq!(body["formatted"], "$200,000");

        let (_, body) = call(&app, "GET", "/estimate?property_value=1000000&mortgage_balance=0", None).await;
        assert_eq!(body["estimate"], 390_000);

        let (status, _) = call(&app, "GET", "/estimate?property_value=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let app = app();
        let id = new_session(&app).await;

        let (status, body) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"]["step"], 1);
        assert_eq!(body["view"]["stage"]["kind"], "quiz");

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/events"),
            Some(json!({"type": "zip_input", "raw": "12a3b45678"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "applied");
        assert_eq!(body["view"]["zip_code"], "12345");
        assert_eq!(body["view"]["zip_submit_enabled"], true);

        let (_, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/events"),
            Some(json!({"type": "submit_zip"})),
        )
        .await;
        assert_eq!(body["view"]["step"], 2);
        assert_eq!(body["view"]["progress_percent"], 12);

        let (_, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/events"),
            Some(json!({"type": "go_back"})),
        )
        .await;
        assert_eq!(body["outcome"], "ignored");

        let (status, body) = call(&app, "POST", &format!("/sessions/{id}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"]["step"], 1);
        assert_eq!(body["view"]["zip_code"], "");

        let (status, _) = call(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_bad_requests() {
        let app = app();
        let id = new_session(&app).await;
        let events = format!("/sessions/{id}/events");

        let (status, _) = call(
            &app,
            "POST",
            &events,
            Some(json!({"type": "select_goal", "goal": "retirement"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(
            &app,
            "POST",
            &events,
            Some(json!({"type": "timer", "epoch": 0, "kind": {"type": "advance"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            &events,
            Some(json!({"type": "select_property_value", "value": 451000})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, "GET", "/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = Uuid::new_v4();
        let (status, body) = call(&app, "GET", &format!("/sessions/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["session_id"], missing.to_string());
    }

    #[test]
    fn every_library_error_maps_to_a_status() {
        use funnel_flow::{QuizStep, Stage};

        let cases = [
            (
                FunnelError::EventNotAllowed {
                    event: "select_goal",
                    stage: Stage::Quiz(QuizStep::ZipEntry),
                },
                StatusCode::CONFLICT,
            ),
            (FunnelError::SessionNotFound("gone".into()), StatusCode::NOT_FOUND),
            (FunnelError::InvalidStep(9), StatusCode::BAD_REQUEST),
            (FunnelError::UnknownPropertyValue(451_000), StatusCode::BAD_REQUEST),
            (
                FunnelError::ConfigError("bad pacing".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            let (status, Json(body)) = funnel_error(error);
            assert_eq!(status, expected);
            assert!(body["error"].is_string());
        }
    }
}
