//! Per-call deadline for evaluator operations.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use interviewer_report::{AnswerEvaluation, FinalFeedback};
use tracing::warn;

use super::{AnswerRequest, Evaluator, FeedbackRequest, QuestionRequest};
use crate::error::{EvaluatorErrorKind, InterviewError, Result};

/// Fails any call to the wrapped evaluator that runs past `deadline`.
///
/// A timed-out call surfaces as `EvaluatorUnavailable` with kind
/// [`EvaluatorErrorKind::Timeout`]; the in-flight future is dropped.
#[derive(Debug)]
pub struct DeadlineEvaluator<E> {
    inner: E,
    deadline: Duration,
}

impl<E: Evaluator> DeadlineEvaluator<E> {
    /// Wraps `inner` with a per-call `deadline`.
    #[must_use]
    pub const fn new(inner: E, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    /// Returns the configured deadline.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn run<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        if let Ok(result) = tokio::time::timeout(self.deadline, call).await {
            result
        } else {
            warn!(
                operation,
                deadline_secs = self.deadline.as_secs_f64(),
                "Evaluator call timed out"
            );
            Err(InterviewError::evaluator_unavailable(
                EvaluatorErrorKind::Timeout,
                format!(
                    "{operation} did not finish within {:.1}s",
                    self.deadline.as_secs_f64()
                ),
            ))
        }
    }
}

#[async_trait]
impl<E: Evaluator> Evaluator for DeadlineEvaluator<E> {
    async fn generate_question(&self, request: &QuestionRequest<'_>) -> Result<String> {
        self.run("generate question", self.inner.generate_question(request))
            .await
    }

    async fn evaluate_answer(&self, request: &AnswerRequest<'_>) -> Result<AnswerEvaluation> {
        self.run("evaluate answer", self.inner.evaluate_answer(request))
            .await
    }

    async fn generate_final_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> Result<FinalFeedback> {
        self.run(
            "generate final feedback",
            self.inner.generate_final_feedback(request),
        )
        .await
    }

    async fn probe(&self) -> Result<()> {
        self.run("probe", self.inner.probe()).await
    }
}
