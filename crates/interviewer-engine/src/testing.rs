//! Scripted evaluator shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use interviewer_report::{AnswerEvaluation, FinalFeedback};

use crate::error::{EvaluatorErrorKind, InterviewError, Result};
use crate::evaluator::{AnswerRequest, Evaluator, FeedbackRequest, QuestionRequest};

/// Deterministic evaluator: questions are `"Question {n}?"`, scores come from
/// a queue (7.0 once it runs dry), and each operation can be made to fail once.
#[derive(Default)]
pub struct ScriptedEvaluator {
    scores: Mutex<VecDeque<f64>>,
    fail_next_question: AtomicBool,
    fail_next_evaluation: AtomicBool,
    fail_next_feedback: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub question_calls: AtomicUsize,
    pub evaluation_calls: AtomicUsize,
    pub feedback_calls: AtomicUsize,
}

impl ScriptedEvaluator {
    pub fn with_scores(scores: &[f64]) -> Self {
        let evaluator = Self::default();
        evaluator.scores.lock().unwrap().extend(scores.iter().copied());
        evaluator
    }

    pub fn fail_next_question(&self) {
        self.fail_next_question.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_evaluation(&self) {
        self.fail_next_evaluation.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_feedback(&self) {
        self.fail_next_feedback.store(true, Ordering::SeqCst);
    }

    /// Makes every call sleep for `delay` first.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn unavailable() -> InterviewError {
        InterviewError::evaluator_unavailable(EvaluatorErrorKind::Server, "scripted failure")
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn generate_question(&self, request: &QuestionRequest<'_>) -> Result<String> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_next_question.swap(false, Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(format!("Question {}?", request.question_number))
    }

    async fn evaluate_answer(&self, request: &AnswerRequest<'_>) -> Result<AnswerEvaluation> {
        self.evaluation_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_next_evaluation.swap(false, Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let score = self.scores.lock().unwrap().pop_front().unwrap_or(7.0);
        Ok(AnswerEvaluation {
            score,
            rationale: format!("Evaluated: {}", request.answer),
            strengths: vec!["clear".to_string()],
            improvements: vec!["depth".to_string()],
            fallback: false,
        })
    }

    async fn generate_final_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> Result<FinalFeedback> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_next_feedback.swap(false, Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(FinalFeedback {
            summary: format!("{} answered {} questions", request.candidate.name, request.history.len()),
            strengths: vec!["communication".to_string()],
            weaknesses: vec!["testing".to_string()],
            recommendations: vec!["practice".to_string()],
            fallback: false,
        })
    }
}
