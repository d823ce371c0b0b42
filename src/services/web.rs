//! Axum-based HTTP server for the intersection API.
//!
//! Provides REST endpoints for:
//! - GET `/api/state` - Current intersection state
//! - POST `/api/detections` - Ingest one detector frame
//! - POST `/api/override` - Request a preemption override
//! - DELETE `/api/override/:id` - Clear an override by id
//! - GET `/api/overrides` - List live overrides

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::api::{
    ApiResponse, CommandResponse, DetectionReport, OverrideRequest, OverrideResponse,
    StateResponse,
};
use super::shared::SharedEngineState;

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/state - Returns the current intersection state
async fn get_state(
    State(state): State<Arc<SharedEngineState>>,
) -> Json<ApiResponse<StateResponse>> {
    let snapshot = state.snapshot();
    Json(ApiResponse::ok(StateResponse::from(&snapshot)))
}

/// POST /api/detections - Ingest one detector frame
///
/// Accepts JSON: `{"lanes": [{"vehicle_count": 3}, ...]}` with one entry
/// per configured lane, in lane-id order.
async fn post_detections(
    State(state): State<Arc<SharedEngineState>>,
    Json(report): Json<DetectionReport>,
) -> Json<ApiResponse<CommandResponse>> {
    let lanes = state.with_engine(|engine| engine.config().lanes);
    if report.lanes.len() != lanes {
        return Json(ApiResponse::err(format!(
            "Frame must cover all {} lanes, got {}",
            lanes,
            report.lanes.len()
        )));
    }

    let now_ms = state.now_ms();
    let raised = state.with_engine(|engine| engine.ingest(&report.lanes, now_ms));

    let result = if raised.is_empty() {
        "ingested".to_string()
    } else {
        format!("ingested, {} emergency override(s) raised", raised.len())
    };
    Json(ApiResponse::ok(CommandResponse::accepted(result)))
}

/// POST /api/override - Request a preemption override
///
/// Accepts JSON: `{"lane": 3, "kind": "emergency"}` or
/// `{"lane": 1, "kind": "priority_transport"}`.
async fn request_override(
    State(state): State<Arc<SharedEngineState>>,
    Json(request): Json<OverrideRequest>,
) -> Json<ApiResponse<OverrideResponse>> {
    let lanes = state.with_engine(|engine| engine.config().lanes);
    if request.lane >= lanes {
        return Json(ApiResponse::err(format!(
            "Unknown lane {} (lanes are 0..{})",
            request.lane, lanes
        )));
    }

    let now_ms = state.now_ms();
    let ov = state.with_engine(|engine| engine.request_override(request.lane, request.kind, now_ms));
    Json(ApiResponse::ok(OverrideResponse::from(&ov)))
}

/// DELETE /api/override/:id - Clear an override by id
async fn clear_override(
    State(state): State<Arc<SharedEngineState>>,
    Path(id): Path<u64>,
) -> Json<ApiResponse<CommandResponse>> {
    let cleared = state.with_engine(|engine| engine.clear_override(id));
    if cleared {
        Json(ApiResponse::ok(CommandResponse::accepted("override cleared")))
    } else {
        Json(ApiResponse::ok(CommandResponse::rejected(
            "unknown override id",
        )))
    }
}

/// GET /api/overrides - List live overrides
async fn list_overrides(
    State(state): State<Arc<SharedEngineState>>,
) -> Json<ApiResponse<Vec<OverrideResponse>>> {
    let overrides = state.with_engine(|engine| engine.active_overrides());
    Json(ApiResponse::ok(
        overrides.iter().map(OverrideResponse::from).collect(),
    ))
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_permissive: true,
        }
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }
}

/// Build the Axum router with all routes
pub fn build_router(state: Arc<SharedEngineState>, config: &WebServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/state", get(get_state))
        .route("/api/detections", post(post_detections))
        .route("/api/override", post(request_override))
        .route("/api/override/:id", delete(clear_override))
        .route("/api/overrides", get(list_overrides))
        .fallback(not_found)
        .with_state(state);

    // Add CORS if requested
    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server.
///
/// This function blocks until the server is shut down. Use
/// [`run_server_with_state`] to share the state with the runner.
pub async fn run_server(
    engine: crate::engine::IntersectionEngine,
    config: WebServerConfig,
) -> Result<(), std::io::Error> {
    let state = Arc::new(SharedEngineState::new(engine));
    run_server_with_state(state, config).await
}

/// Start the web server with shared state.
///
/// Use this when the [`EngineRunner`](super::runner::EngineRunner) (or
/// anything else) shares the same `SharedEngineState`.
pub async fn run_server_with_state(
    state: Arc<SharedEngineState>,
    config: WebServerConfig,
) -> Result<(), std::io::Error> {
    let router = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("web server listening on http://{}", config.addr);

    axum::serve(listener, router).await
}
