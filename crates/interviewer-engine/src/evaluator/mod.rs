//! Evaluator client contract.
//!
//! The engine never writes interview text itself. It asks an [`Evaluator`] for
//! three things: the next question, a structured evaluation of an answer, and
//! narrative feedback for the finished interview. Each call is independent;
//! whatever context a call needs is passed in its request.
//!
//! # Implementations
//!
//! - [`LlmEvaluator`] - builds prompts for any [`TextGenerator`] and extracts
//!   structured records from its replies, with a fallback for malformed ones
//! - [`GeminiClient`] - a [`TextGenerator`] over the Gemini REST API
//! - [`DeadlineEvaluator`] - wraps another evaluator with a per-call deadline

mod deadline;
mod gemini;
mod llm;

pub use deadline::DeadlineEvaluator;
pub use gemini::{GeminiClient, AVAILABLE_MODELS};
pub use llm::{parse_answer_evaluation, parse_final_feedback, LlmEvaluator};

use async_trait::async_trait;
use interviewer_report::{AnswerEvaluation, Difficulty, FinalFeedback, QuestionAnswer};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Who is being interviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    /// Candidate's name.
    pub name: String,
    /// Years of professional experience.
    pub experience_years: u32,
}

/// Input for [`Evaluator::generate_question`].
#[derive(Debug, Clone, Copy)]
pub struct QuestionRequest<'a> {
    /// The job posting text.
    pub job_description: &'a str,
    /// The candidate.
    pub candidate: &'a CandidateProfile,
    /// Questions asked so far, in order.
    pub prior_questions: &'a [String],
    /// Answers given so far, in order.
    pub prior_answers: &'a [String],
    /// Position of the question being generated (1-indexed).
    pub question_number: u32,
    /// Number of questions in the interview.
    pub total_questions: u32,
    /// Requested difficulty.
    pub difficulty: Difficulty,
}

/// Input for [`Evaluator::evaluate_answer`].
#[derive(Debug, Clone, Copy)]
pub struct AnswerRequest<'a> {
    /// The question that was asked.
    pub question: &'a str,
    /// The candidate's answer.
    pub answer: &'a str,
    /// The job posting text.
    pub job_description: &'a str,
    /// Requested difficulty.
    pub difficulty: Difficulty,
}

/// Input for [`Evaluator::generate_final_feedback`].
#[derive(Debug, Clone, Copy)]
pub struct FeedbackRequest<'a> {
    /// The job posting text.
    pub job_description: &'a str,
    /// The candidate.
    pub candidate: &'a CandidateProfile,
    /// Every evaluated question with its answer, score, and evaluation.
    pub history: &'a [QuestionAnswer],
    /// Mean of the recorded scores.
    pub average_score: f64,
}

/// Produces questions, answer evaluations, and final feedback.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Generates the next question.
    ///
    /// Fails with `EvaluatorUnavailable` when the capability cannot be reached
    /// and with `EvaluatorEmptyResponse` when the trimmed text is empty.
    async fn generate_question(&self, request: &QuestionRequest<'_>) -> Result<String>;

    /// Evaluates one answer.
    ///
    /// A malformed reply is not an error: implementations return a fallback
    /// record carrying the neutral score and the raw text.
    async fn evaluate_answer(&self, request: &AnswerRequest<'_>) -> Result<AnswerEvaluation>;

    /// Generates narrative feedback for the whole interview.
    ///
    /// Same malformed-reply policy as [`Evaluator::evaluate_answer`].
    async fn generate_final_feedback(&self, request: &FeedbackRequest<'_>)
        -> Result<FinalFeedback>;

    /// Checks that the capability is reachable.
    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}

/// Raw text generation, the transport under [`LlmEvaluator`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model's reply to `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
