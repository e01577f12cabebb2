//! Interview Engine
//!
//! Runs multi-question interviews: asks an evaluator for questions, scores
//! answers, and turns a finished session into a report. Serves the HTTP API
//! and the WebSocket interview channel.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod registry;
pub mod service;
pub mod session;
pub mod websocket;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod testing;

pub use api::{
    create_router, AppState, EndInterviewRequest, EndInterviewResponse, ErrorResponse,
    HealthResponse, StartInterviewRequest, StartInterviewResponse, SubmitAnswerRequest,
    SubmitAnswerResponse,
};
pub use audio::{AudioFormat, SUPPORTED_FORMATS};
pub use config::{Config, EvaluatorConfig, StorageMode, CONFIG_FILE_NAME, MAX_TOTAL_QUESTIONS};
pub use error::{EvaluatorErrorKind, InterviewError, Result};
pub use evaluator::{
    AnswerRequest, CandidateProfile, DeadlineEvaluator, Evaluator, FeedbackRequest, GeminiClient,
    LlmEvaluator, QuestionRequest, TextGenerator, AVAILABLE_MODELS,
};
pub use events::{EventBroadcaster, InterviewEvent};
pub use registry::{SessionHandle, SessionRegistry};
pub use service::{InterviewService, StartedSession};
pub use session::{
    InterviewSession, ReportSinks, SessionConfig, SessionSnapshot, SessionStatus, SubmitOutcome,
    DEFAULT_CANDIDATE_NAME,
};
pub use websocket::ClientMessage;
