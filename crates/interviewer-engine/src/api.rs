//! HTTP API for the interview service.
//!
//! # Endpoints
//!
//! - `POST /api/start-interview` - Start an interview, returns the first question
//! - `POST /api/submit-answer` - Submit an answer, returns the next question or the report
//! - `POST /api/end-interview` - End an interview, returns the report
//! - `GET /api/interview/:session_id/state` - Current session state
//! - `GET /api/health` - Service health and evaluator readiness
//! - `GET /api/models` - Available evaluator models
//! - `GET /api/audio/formats` - Supported audio formats
//! - `GET /api/data/interviews` - Stored reports
//! - `GET /api/data/statistics` - Statistics over stored reports
//! - `GET /api/data/interview/:session_id` - One stored report
//! - `GET /api/data/interview/:session_id/report?format=markdown|json` - Rendered report
//! - `GET /ws/interview/:session_id` - WebSocket interview channel
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use interviewer_engine::{create_router, AppState, Config, InterviewService, ReportSinks};
//! # use interviewer_engine::Evaluator;
//!
//! # async fn example(evaluator: Arc<dyn Evaluator>) {
//! let service = Arc::new(InterviewService::new(evaluator, ReportSinks::none()));
//! let router = create_router(AppState::new(Config::default(), service));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use interviewer_report::{
    json::JsonGenerator, AnswerEvaluation, Difficulty, MarkdownGenerator, Report,
};
use interviewer_store::Statistics;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::audio::SUPPORTED_FORMATS;
use crate::config::{Config, StorageMode};
use crate::error::{EvaluatorErrorKind, InterviewError};
use crate::evaluator::AVAILABLE_MODELS;
use crate::service::InterviewService;
use crate::session::{SessionConfig, SessionSnapshot, SubmitOutcome, DEFAULT_CANDIDATE_NAME};
use crate::websocket::ws_handler;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for `POST /api/start-interview`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartInterviewRequest {
    /// The job posting text (required).
    #[serde(default)]
    pub job_description: Option<String>,
    /// Candidate's name.
    #[serde(default)]
    pub candidate_name: Option<String>,
    /// Candidate's years of experience.
    #[serde(default)]
    pub experience_years: Option<u32>,
    /// Requested difficulty.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Number of questions; the configured default when absent.
    #[serde(default)]
    pub total_questions: Option<u32>,
}

/// Response body for `POST /api/start-interview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartInterviewResponse {
    /// Always `"started"`.
    pub status: String,
    /// Identifier of the new session.
    pub session_id: String,
    /// The first question.
    pub question: String,
    /// Always 1.
    pub question_number: u32,
    /// Number of questions in the interview.
    pub total_questions: u32,
}

/// Request body for `POST /api/submit-answer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    /// The session to answer in.
    pub session_id: String,
    /// The answer text.
    #[serde(default)]
    pub answer: String,
}

/// Response body for `POST /api/submit-answer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitAnswerResponse {
    /// The interview continues.
    InProgress {
        /// Evaluation of the submitted answer.
        evaluation: AnswerEvaluation,
        /// The next question.
        question: String,
        /// Its position (1-indexed).
        question_number: u32,
        /// Number of questions in the interview.
        total_questions: u32,
    },
    /// The interview is complete.
    Completed {
        /// Evaluation of the last answer.
        evaluation: AnswerEvaluation,
        /// The final report.
        report: Box<Report>,
    },
}

/// Request body for `POST /api/end-interview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndInterviewRequest {
    /// The session to end.
    pub session_id: String,
}

/// Response body for `POST /api/end-interview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndInterviewResponse {
    /// Always `"completed"`.
    pub status: String,
    /// The final report.
    pub report: Report,
}

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"`.
    pub status: String,
    /// Whether the evaluator answered its startup probe.
    pub evaluator_ready: bool,
    /// Number of sessions in the registry.
    pub active_sessions: usize,
    /// Configured storage mode.
    pub storage_mode: StorageMode,
}

/// Response body for `GET /api/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Models the evaluator can use.
    pub models: Vec<String>,
    /// The configured model.
    pub current: String,
}

/// Response body for `GET /api/audio/formats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFormatsResponse {
    /// Supported format names.
    pub formats: Vec<String>,
}

/// Response body for `GET /api/data/interviews`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewsResponse {
    /// Number of stored reports.
    pub total: usize,
    /// The stored reports.
    pub interviews: Vec<Report>,
}

/// Query string for `GET /api/data/interview/:session_id/report`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    /// `markdown` (default) or `json`.
    #[serde(default)]
    pub format: Option<String>,
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
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The interview service.
    pub service: Arc<InterviewService>,
}

impl AppState {
    /// Creates a new `AppState`.
    #[must_use]
    pub const fn new(config: Config, service: Arc<InterviewService>) -> Self {
        Self { config, service }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Maps engine errors onto HTTP responses.
#[derive(Debug)]
struct ApiError(InterviewError);

impl From<InterviewError> for ApiError {
    fn from(err: InterviewError) -> Self {
        Self(err)
    }
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match &self.0 {
            InterviewError::Validation { .. } | InterviewError::StorageDisabled => {
                StatusCode::BAD_REQUEST
            }
            InterviewError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            InterviewError::InvalidState { .. } => StatusCode::CONFLICT,
            InterviewError::EvaluatorEmptyResponse { .. } => StatusCode::BAD_GATEWAY,
            InterviewError::EvaluatorUnavailable {
                kind: EvaluatorErrorKind::Timeout,
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            InterviewError::EvaluatorUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ============================================================================
// Router Setup
// ============================================================================

/// Builds the CORS layer from the configured origins.
///
/// `*` allows any origin; origins that are not valid header values are
/// skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| warn!(origin = %origin, "Ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Creates the HTTP router with all API and WebSocket endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let api_routes = Router::new()
        .route("/start-interview", post(handle_start_interview))
        .route("/submit-answer", post(handle_submit_answer))
        .route("/end-interview", post(handle_end_interview))
        .route("/interview/:session_id/state", get(handle_state))
        .route("/health", get(handle_health))
        .route("/models", get(handle_models))
        .route("/audio/formats", get(handle_audio_formats))
        .route("/data/interviews", get(handle_list_interviews))
        .route("/data/statistics", get(handle_statistics))
        .route("/data/interview/:session_id", get(handle_get_interview))
        .route("/data/interview/:session_id/report", get(handle_render_interview));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws/interview/:session_id", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Interview Handlers
// ============================================================================

/// Handler for `POST /api/start-interview`.
async fn handle_start_interview(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartInterviewRequest>,
) -> ApiResult<StartInterviewResponse> {
    let job_description = request
        .job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| InterviewError::validation("Job description required"))?;

    let config = SessionConfig {
        job_description,
        candidate_name: request
            .candidate_name
            .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string()),
        experience_years: request.experience_years.unwrap_or(0),
        difficulty: request.difficulty.unwrap_or_default(),
        total_questions: request
            .total_questions
            .unwrap_or(state.config.total_questions),
    };
    info!(
        candidate = %config.candidate_name,
        difficulty = %config.difficulty,
        total_questions = config.total_questions,
        "Starting interview"
    );

    let started = state.service.start_session(config).await?;
    Ok(Json(StartInterviewResponse {
        status: "started".to_string(),
        session_id: started.session_id,
        question: started.question,
        question_number: started.question_number,
        total_questions: started.total_questions,
    }))
}

/// Handler for `POST /api/submit-answer`.
async fn handle_submit_answer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitAnswerRequest>,
) -> ApiResult<SubmitAnswerResponse> {
    let outcome = state
        .service
        .submit_answer(&request.session_id, &request.answer)
        .await?;

    let response = match outcome {
        SubmitOutcome::Next {
            question,
            question_number,
            total_questions,
            evaluation,
        } => SubmitAnswerResponse::InProgress {
            evaluation,
            question,
            question_number,
            total_questions,
        },
        SubmitOutcome::Completed { evaluation, report } => SubmitAnswerResponse::Completed {
            evaluation,
            report: Box::new(report),
        },
    };
    Ok(Json(response))
}

/// Handler for `POST /api/end-interview`.
async fn handle_end_interview(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EndInterviewRequest>,
) -> ApiResult<EndInterviewResponse> {
    let report = state.service.end_session(&request.session_id).await?;
    Ok(Json(EndInterviewResponse {
        status: "completed".to_string(),
        report,
    }))
}

/// Handler for `GET /api/interview/:session_id/state`.
async fn handle_state(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.service.get_state(&session_id).await?))
}

// ============================================================================
// Service Handlers
// ============================================================================

/// Handler for `GET /api/health`.
async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        evaluator_ready: state.service.evaluator_ready(),
        active_sessions: state.service.registry().len().await,
        storage_mode: state.config.storage_mode,
    })
}

/// Handler for `GET /api/models`.
async fn handle_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: AVAILABLE_MODELS.iter().map(ToString::to_string).collect(),
        current: state.config.evaluator.model.clone(),
    })
}

/// Handler for `GET /api/audio/formats`.
async fn handle_audio_formats() -> Json<AudioFormatsResponse> {
    Json(AudioFormatsResponse {
        formats: SUPPORTED_FORMATS.iter().map(ToString::to_string).collect(),
    })
}

// ============================================================================
// Data Handlers
// ============================================================================

/// Handler for `GET /api/data/interviews`.
async fn handle_list_interviews(
    State(state): State<Arc<AppState>>,
) -> ApiResult<InterviewsResponse> {
    let interviews = state.service.list_interviews().await?;
    Ok(Json(InterviewsResponse {
        total: interviews.len(),
        interviews,
    }))
}

/// Handler for `GET /api/data/statistics`.
async fn handle_statistics(State(state): State<Arc<AppState>>) -> ApiResult<Statistics> {
    Ok(Json(state.service.statistics().await?))
}

/// Handler for `GET /api/data/interview/:session_id`.
async fn handle_get_interview(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Report> {
    state
        .service
        .find_interview(&session_id)
        .await?
        .map(Json)
        .ok_or_else(|| InterviewError::session_not_found(session_id).into())
}

/// Handler for `GET /api/data/interview/:session_id/report`.
///
/// Renders a stored report as Markdown for reviewers, or as pretty JSON for
/// download.
async fn handle_render_interview(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format.as_deref().unwrap_or("markdown");
    let report = state
        .service
        .find_interview(&session_id)
        .await?
        .ok_or_else(|| InterviewError::session_not_found(&session_id))?;

    let (content_type, body) = match format.trim().to_lowercase().as_str() {
        "markdown" | "md" => (
            "text/markdown; charset=utf-8",
            MarkdownGenerator::new(&report).generate(),
        ),
        "json" => (
            "application/json",
            JsonGenerator::new(&report)
                .generate_pretty()
                .map_err(InterviewError::from)?,
        ),
        other => {
            return Err(InterviewError::validation(format!(
                "unsupported report format '{other}': expected 'markdown' or 'json'"
            ))
            .into());
        }
    };

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

// ============================================================================
// Tests
// ============================================================================
