use crate::store::SnapshotStore;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const ALLOWED_METHODS: &str = "GET, OPTIONS";

/// Shared state for the snapshot server
#[derive(Clone)]
pub struct ServerState {
    pub store: SnapshotStore,
}

/// Body returned when no snapshot can be served
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Every path serves the snapshot; CORS headers go on every response.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .fallback(serve_snapshot)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(cors_middleware)),
        )
        .with_state(state)
}

/// Bind `0.0.0.0:{port}` and serve until `shutdown` resolves
pub async fn start_snapshot_server<F>(
    state: ServerState,
    port: u16,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let snapshot_path = state.store.path().display().to_string();
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Snapshot server listening on http://{} (serving {})", addr, snapshot_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Answers preflight requests and stamps permissive CORS headers
pub async fn cors_middleware(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    response
}

/// Current snapshot bytes, verbatim
async fn serve_snapshot(State(state): State<ServerState>) -> Response {
    match state.store.read_bytes().await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            Body::from(bytes),
        )
            .into_response(),
        Err(e) => {
            warn!(path = %state.store.path().display(), "Snapshot not readable: {}", e);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Data not ready or not generated yet.".to_string(),
                }),
            )
                .into_response()
        }
    }
}
