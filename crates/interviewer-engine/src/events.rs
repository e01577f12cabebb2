//! Interview events and their broadcaster.
//!
//! Every state change made through [`crate::InterviewService`] is published
//! here, whichever transport caused it. WebSocket connections subscribe and
//! forward the events that belong to their session.
//!
//! # Event Types
//!
//! - `connected` - Sent to a new WebSocket client, includes the session state
//! - `question` - A question was issued
//! - `evaluation` - An answer was evaluated
//! - `interview_complete` - The final report is ready
//! - `state` - Current session state, on request
//! - `error` - An operation failed

use interviewer_report::{AnswerEvaluation, Report};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::SessionSnapshot;

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `connected` and `state` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    /// The session state.
    pub state: SessionSnapshot,
}

/// Payload for the `question` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    /// Session the question belongs to.
    pub session_id: String,
    /// The question text.
    pub question: String,
    /// Position of the question (1-indexed).
    pub question_number: u32,
    /// Number of questions in the interview.
    pub total_questions: u32,
}

/// Payload for the `evaluation` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPayload {
    /// Session the answer belongs to.
    pub session_id: String,
    /// Position of the evaluated question.
    pub question_number: u32,
    /// The evaluation.
    pub evaluation: AnswerEvaluation,
}

/// Payload for the `interview_complete` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    /// The final report.
    pub report: Report,
}

/// Payload for the `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Session the error relates to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// Server-to-client interview events.
///
/// Serialized as JSON objects with `event` and `payload` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum InterviewEvent {
    /// Sent when a client connects.
    Connected(StatePayload),
    /// Sent when a question is issued.
    Question(QuestionPayload),
    /// Sent when an answer is evaluated.
    Evaluation(EvaluationPayload),
    /// Sent when the interview report is ready.
    InterviewComplete(CompletePayload),
    /// Sent in reply to a state request.
    State(StatePayload),
    /// Sent when an operation fails.
    Error(ErrorPayload),
}

impl InterviewEvent {
    /// Creates a `Connected` event.
    #[must_use]
    pub const fn connected(state: SessionSnapshot) -> Self {
        Self::Connected(StatePayload { state })
    }

    /// Creates a `Question` event.
    #[must_use]
    pub fn question(
        session_id: impl Into<String>,
        question: impl Into<String>,
        question_number: u32,
        total_questions: u32,
    ) -> Self {
        Self::Question(QuestionPayload {
            session_id: session_id.into(),
            question: question.into(),
            question_number,
            total_questions,
        })
    }

    /// Creates an `Evaluation` event.
    #[must_use]
    pub fn evaluation(
        session_id: impl Into<String>,
        question_number: u32,
        evaluation: AnswerEvaluation,
    ) -> Self {
        Self::Evaluation(EvaluationPayload {
            session_id: session_id.into(),
            question_number,
            evaluation,
        })
    }

    /// Creates an `InterviewComplete` event.
    #[must_use]
    pub const fn interview_complete(report: Report) -> Self {
        Self::InterviewComplete(CompletePayload { report })
    }

    /// Creates a `State` event.
    #[must_use]
    pub const fn state(state: SessionSnapshot) -> Self {
        Self::State(StatePayload { state })
    }

    /// Creates an `Error` event.
    #[must_use]
    pub fn error(session_id: Option<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            session_id,
            message: message.into(),
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::Question(_) => "question",
            Self::Evaluation(_) => "evaluation",
            Self::InterviewComplete(_) => "interview_complete",
            Self::State(_) => "state",
            Self::Error(_) => "error",
        }
    }

    /// Returns the session this event belongs to.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Connected(p) | Self::State(p) => Some(&p.state.session_id),
            Self::Question(p) => Some(&p.session_id),
            Self::Evaluation(p) => Some(&p.session_id),
            Self::InterviewComplete(p) => Some(&p.report.session_id),
            Self::Error(p) => p.session_id.as_deref(),
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Publishes interview events to every subscriber.
///
/// Events are not retained for subscribers that join later.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<InterviewEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with a per-subscriber buffer of `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber.
    ///
    /// A subscriber that falls more than `capacity` events behind receives a
    /// `Lagged` error and misses those events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InterviewEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event and returns the number of subscribers reached.
    pub fn send(&self, event: InterviewEvent) -> usize {
        // Err only means nobody is listening
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
