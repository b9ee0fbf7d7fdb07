//! HTTP API endpoints for the Ascent orchestrator.
//!
//! This module provides the REST API clients drive an attempt through:
//! opening it, passing the thinking gate, submitting code, requesting hints,
//! reflecting, and abandoning. A WebSocket endpoint streams session events.
//!
//! # Endpoints
//!
//! - `GET  /api/status` - Service status
//! - `POST /api/attempts` - Open a new attempt
//! - `GET  /api/attempts/{id}` - Fetch an attempt
//! - `POST /api/attempts/{id}/thinking` - Submit the thinking gate
//! - `POST /api/attempts/{id}/code` - Submit code
//! - `POST /api/attempts/{id}/hints` - Request a hint
//! - `POST /api/attempts/{id}/resume` - Resume coding after a hint
//! - `POST /api/attempts/{id}/reflection` - Submit a reflection
//! - `POST /api/attempts/{id}/abandon` - Abandon the attempt
//! - `GET  /api/users/{user}/progress` - A learner's attempts and skills
//! - `GET  /ws` - WebSocket event stream

use std::sync::Arc;

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use ascent_engine::{Attempt, HintLevel, Pattern};

use crate::error::CoachError;
use crate::session::{CoachService, HintGrant, SubmissionReview, ThinkingReview, UserProgress};
use crate::websocket::handle_socket;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening an attempt.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttemptRequest {
    /// The learner opening the attempt.
    pub user_id: String,
    /// The problem to attempt.
    pub problem_id: String,
}

/// Request body for the thinking-gate endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingRequest {
    /// The pattern the learner intends to apply.
    pub pattern: Pattern,
    /// The invariant the solution will maintain.
    pub invariant: String,
}

/// Request body for the code-submission endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRequest {
    /// The submitted source text.
    pub code: String,
    /// Submission language; defaults to the configured language.
    #[serde(default)]
    pub language: Option<String>,
}

/// Request body for the hint endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    /// Specific level to request; defaults to the cheapest affordable one.
    #[serde(default)]
    pub level: Option<HintLevel>,
}

/// Request body for the reflection endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionRequest {
    /// The reflection write-up.
    pub text: String,
}

/// Response body for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always "ok" when the service is up.
    pub status: String,
    /// Number of problems in the served catalog.
    pub problems: usize,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The use-case layer all handlers drive.
    pub service: Arc<CoachService>,
}

impl AppState {
    /// Creates a new `AppState` over a service.
    #[must_use]
    pub fn new(service: Arc<CoachService>) -> Self {
        Self { service }
    }
}

// ============================================================================
// API Error Mapping
// ============================================================================

/// Wrapper mapping [`CoachError`] onto HTTP responses.
struct ApiError(CoachError);

impl From<CoachError> for ApiError {
    fn from(err: CoachError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoachError::AttemptNotFound { .. } | CoachError::ProblemNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            CoachError::RungLocked { .. } => StatusCode::FORBIDDEN,
            CoachError::InvalidTransition(_)
            | CoachError::VersionConflict { .. }
            | CoachError::IdempotencyConflict { .. } => StatusCode::CONFLICT,
            CoachError::ExecutionFailed { .. } | CoachError::EvidenceUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            CoachError::ConfigParseError { .. }
            | CoachError::ConfigValidationError { .. }
            | CoachError::Storage { .. }
            | CoachError::Io(_)
            | CoachError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/attempts", post(create_attempt))
        .route("/api/attempts/:id", get(get_attempt))
        .route("/api/attempts/:id/thinking", post(submit_thinking))
        .route("/api/attempts/:id/code", post(submit_code))
        .route("/api/attempts/:id/hints", post(request_hint))
        .route("/api/attempts/:id/resume", post(resume_coding))
        .route("/api/attempts/:id/reflection", post(submit_reflection))
        .route("/api/attempts/:id/abandon", post(abandon_attempt))
        .route("/api/users/:user/progress", get(get_progress))
        .route("/ws", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        problems: state.service.catalog().problems.len(),
    })
}

async fn create_attempt(
    State(state): State<AppState>,
    Json(req): Json<CreateAttemptRequest>,
) -> ApiResult<(StatusCode, Json<Attempt>)> {
    let attempt = state
        .service
        .start_attempt(&req.user_id, &req.problem_id)
        .await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

async fn get_attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Attempt>> {
    Ok(Json(state.service.attempt(&id)?))
}

async fn submit_thinking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ThinkingRequest>,
) -> ApiResult<Json<ThinkingReview>> {
    let review = state
        .service
        .submit_thinking(&id, req.pattern, &req.invariant)
        .await?;
    Ok(Json(review))
}

async fn submit_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CodeRequest>,
) -> ApiResult<Json<SubmissionReview>> {
    let review = state
        .service
        .submit_code(&id, &req.code, req.language.as_deref())
        .await?;
    Ok(Json(review))
}

async fn request_hint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<HintRequest>,
) -> ApiResult<Json<HintGrant>> {
    let grant = state.service.request_hint(&id, req.level).await?;
    Ok(Json(grant))
}

async fn resume_coding(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Attempt>> {
    Ok(Json(state.service.resume_coding(&id).await?))
}

async fn submit_reflection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReflectionRequest>,
) -> ApiResult<Json<Attempt>> {
    Ok(Json(state.service.submit_reflection(&id, &req.text).await?))
}

async fn abandon_attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Attempt>> {
    Ok(Json(state.service.abandon_attempt(&id).await?))
}

async fn get_progress(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<UserProgress>> {
    Ok(Json(state.service.progress_of(&user)?))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("New WebSocket connection request");
    let broadcaster = state.service.broadcaster().clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}
