//! Interview session state machine.
//!
//! A session moves through `Created → InProgress → Completed`:
//!
//! - [`InterviewSession::ask_first`] issues the first question (`Created` only)
//! - [`InterviewSession::submit_answer`] evaluates an answer and either issues
//!   the next question or completes the interview (`InProgress` only)
//! - [`InterviewSession::finalize`] builds the [`Report`] once and caches it
//! - [`InterviewSession::snapshot`] is a read-only projection, valid anywhere
//!
//! An answer is committed together with its evaluation. Until the evaluator
//! returns, the answer is held as *pending*; if the call fails the pending
//! answer is replaced by the next submission. Completed answers, scores, and
//! evaluations therefore always have the same length.
//!
//! Sessions are not internally synchronized. The registry wraps each one in
//! its own async mutex so that exactly one operation runs at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use interviewer_report::{
    aggregate, clamp_score, AnswerEvaluation, Difficulty, QuestionAnswer, Report,
};
use interviewer_store::{AnswerLogEntry, ExportSink, JobDescriptionEntry, ReportStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::MAX_TOTAL_QUESTIONS;
use crate::error::{InterviewError, Result};
use crate::evaluator::{
    AnswerRequest, CandidateProfile, Evaluator, FeedbackRequest, QuestionRequest,
};

/// Name used when the candidate does not give one.
pub const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

// ============================================================================
// Configuration
// ============================================================================

/// Immutable settings of one interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The job posting text.
    pub job_description: String,
    /// Candidate's name.
    pub candidate_name: String,
    /// Candidate's years of experience.
    pub experience_years: u32,
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Number of questions to ask.
    pub total_questions: u32,
}

impl SessionConfig {
    /// Creates a configuration with default candidate, difficulty, and length.
    #[must_use]
    pub fn new(job_description: impl Into<String>) -> Self {
        Self {
            job_description: job_description.into(),
            candidate_name: DEFAULT_CANDIDATE_NAME.to_string(),
            experience_years: 0,
            difficulty: Difficulty::default(),
            total_questions: 5,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InterviewError::Validation` if the job description is blank or
    /// the question count is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.job_description.trim().is_empty() {
            return Err(InterviewError::validation("job description is required"));
        }
        if self.total_questions == 0 || self.total_questions > MAX_TOTAL_QUESTIONS {
            return Err(InterviewError::validation(format!(
                "total questions must be between 1 and {MAX_TOTAL_QUESTIONS}"
            )));
        }
        Ok(())
    }

    fn candidate(&self) -> CandidateProfile {
        let name = self.candidate_name.trim();
        CandidateProfile {
            name: if name.is_empty() {
                DEFAULT_CANDIDATE_NAME.to_string()
            } else {
                name.to_string()
            },
            experience_years: self.experience_years,
        }
    }
}

// ============================================================================
// Status and projections
// ============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Constructed; no question issued yet.
    Created,
    /// At least one question issued; answers are accepted.
    InProgress,
    /// Terminal; no further mutation.
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: String,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// `true` once the first question has been issued.
    pub started: bool,
    /// `true` once the session is completed.
    pub ended: bool,
    /// Candidate's name.
    pub candidate_name: String,
    /// Candidate's years of experience.
    pub experience_years: u32,
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Number of questions the interview was configured for.
    pub total_questions: u32,
    /// Number of questions issued so far.
    pub current_question_number: u32,
    /// The question awaiting an answer, if any.
    pub current_question: Option<String>,
    /// Every question issued, in order.
    pub questions: Vec<String>,
    /// Every committed answer, in order.
    pub answers: Vec<String>,
    /// Scores of the committed answers.
    pub scores: Vec<f64>,
    /// Evaluations of the committed answers.
    pub evaluations: Vec<AnswerEvaluation>,
    /// `true` when an answer was received but its evaluation failed.
    pub has_pending_answer: bool,
    /// Mean of `scores` so far.
    pub average_score: f64,
    /// When the first question was issued.
    pub started_at: Option<DateTime<Utc>>,
    /// When the session completed.
    pub ended_at: Option<DateTime<Utc>>,
}

/// Result of a successful [`InterviewSession::submit_answer`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The interview continues with another question.
    Next {
        /// The next question.
        question: String,
        /// Its position (1-indexed).
        question_number: u32,
        /// Number of questions in the interview.
        total_questions: u32,
        /// Evaluation of the answer just submitted.
        evaluation: AnswerEvaluation,
    },
    /// The last answer was submitted and the interview is complete.
    Completed {
        /// Evaluation of the last answer.
        evaluation: AnswerEvaluation,
        /// The final report.
        report: Report,
    },
}

impl SubmitOutcome {
    /// Returns the evaluation of the submitted answer.
    #[must_use]
    pub const fn evaluation(&self) -> &AnswerEvaluation {
        match self {
            Self::Next { evaluation, .. } | Self::Completed { evaluation, .. } => evaluation,
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Where session data is written. Every write is best-effort.
#[derive(Clone, Default)]
pub struct ReportSinks {
    store: Option<Arc<dyn ReportStore>>,
    export: Option<Arc<dyn ExportSink>>,
    sheet_name: String,
}

impl std::fmt::Debug for ReportSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSinks")
            .field("store", &self.store.is_some())
            .field("export", &self.export.is_some())
            .field("sheet_name", &self.sheet_name)
            .finish()
    }
}

impl ReportSinks {
    /// Creates an empty set of sinks; nothing is persisted.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds a persistence store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Adds an export sink writing to the destination `sheet_name`.
    #[must_use]
    pub fn with_export(
        mut self,
        export: Arc<dyn ExportSink>,
        sheet_name: impl Into<String>,
    ) -> Self {
        self.export = Some(export);
        self.sheet_name = sheet_name.into();
        self
    }

    /// Returns the persistence store, if any.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn ReportStore>> {
        self.store.as_ref()
    }

    async fn record_job_description(&self, session_id: &str, job_description: &str) {
        if let Some(store) = &self.store {
            let entry = JobDescriptionEntry::new(session_id, job_description);
            if let Err(e) = store.save_job_description(&entry).await {
                warn!(session_id, error = %e, "Failed to save job description");
            }
        }
    }

    async fn record_answer(&self, entry: &AnswerLogEntry) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_answer(entry).await {
                warn!(session_id = %entry.session_id, error = %e, "Failed to save answer");
            }
        }
    }

    async fn deliver(&self, report: &Report) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_report(report).await {
                error!(session_id = %report.session_id, error = %e, "Failed to save report");
            }
        }
        if let Some(export) = &self.export {
            if let Err(e) = export.export(report, &self.sheet_name).await {
                error!(
                    session_id = %report.session_id,
                    destination = %self.sheet_name,
                    error = %e,
                    "Failed to export report"
                );
            }
        }
    }
}

// ============================================================================
// InterviewSession
// ============================================================================

/// One candidate's interview.
pub struct InterviewSession {
    id: String,
    config: SessionConfig,
    candidate: CandidateProfile,
    evaluator: Arc<dyn Evaluator>,
    sinks: ReportSinks,
    status: SessionStatus,
    questions: Vec<String>,
    answers: Vec<String>,
    evaluations: Vec<AnswerEvaluation>,
    pending_answer: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    report: Option<Report>,
    last_activity: Instant,
}

impl std::fmt::Debug for InterviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterviewSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("questions", &self.questions.len())
            .field("answers", &self.answers.len())
            .finish_non_exhaustive()
    }
}

impl InterviewSession {
    /// Creates a session in the `Created` state.
    ///
    /// The configuration is assumed valid; see [`SessionConfig::validate`].
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        config: SessionConfig,
        evaluator: Arc<dyn Evaluator>,
        sinks: ReportSinks,
    ) -> Self {
        let candidate = config.candidate();
        Self {
            id: id.into(),
            config,
            candidate,
            evaluator,
            sinks,
            status: SessionStatus::Created,
            questions: Vec::new(),
            answers: Vec::new(),
            evaluations: Vec::new(),
            pending_answer: None,
            started_at: None,
            ended_at: None,
            report: None,
            last_activity: Instant::now(),
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the number of questions issued so far.
    #[must_use]
    pub fn current_question_number(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    /// Returns the number of answers committed with their evaluation.
    #[must_use]
    pub fn answered_count(&self) -> u32 {
        u32::try_from(self.answers.len()).unwrap_or(u32::MAX)
    }

    /// Returns the question awaiting an answer.
    #[must_use]
    pub fn current_question(&self) -> Option<&str> {
        if self.status == SessionStatus::InProgress && self.questions.len() > self.answers.len() {
            self.questions.last().map(String::as_str)
        } else {
            None
        }
    }

    /// Returns how long the session has gone without an operation.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Issues the first question.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is `Created`; evaluator
    /// failures propagate unchanged and leave the session `Created`.
    pub async fn ask_first(&mut self) -> Result<String> {
        if self.status != SessionStatus::Created {
            return Err(InterviewError::invalid_state(
                "ask the first question",
                self.status,
            ));
        }
        self.touch();

        let question = self.request_question().await?;
        self.questions.push(question.clone());
        self.status = SessionStatus::InProgress;
        self.started_at = Some(Utc::now());

        info!(
            session_id = %self.id,
            total_questions = self.config.total_questions,
            "Interview started"
        );
        self.sinks
            .record_job_description(&self.id, &self.config.job_description)
            .await;

        Ok(question)
    }

    /// Submits an answer to the current question.
    ///
    /// On success either the next question or the final report is returned.
    /// On an evaluator failure the session keeps everything committed so far
    /// and the caller may resubmit: an answer whose evaluation failed is
    /// replaced by the new text; if only the next question or the final report
    /// failed, it is generated again and returned with the already committed
    /// evaluation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is `InProgress`, `Validation`
    /// for a blank answer, and evaluator errors unchanged.
    pub async fn submit_answer(&mut self, text: &str) -> Result<SubmitOutcome> {
        if self.status != SessionStatus::InProgress {
            return Err(InterviewError::invalid_state("submit an answer", self.status));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(InterviewError::validation("answer must not be empty"));
        }
        self.touch();

        if self.answers.len() == self.questions.len() {
            // The last answer is committed; the next question or the report is missing.
            debug!(session_id = %self.id, "Resuming after failed evaluator call");
            let evaluation = self.evaluations.last().cloned().unwrap_or_default();
            return self.advance(evaluation).await;
        }

        if let Some(previous) = self.pending_answer.replace(text.to_string()) {
            debug!(
                session_id = %self.id,
                replaced_len = previous.len(),
                "Replacing unevaluated answer"
            );
        }

        let question_number = self.current_question_number();
        let mut evaluation = {
            let question = self.questions.last().map_or("", String::as_str);
            self.evaluator
                .evaluate_answer(&AnswerRequest {
                    question,
                    answer: text,
                    job_description: &self.config.job_description,
                    difficulty: self.config.difficulty,
                })
                .await?
        };
        evaluation.score = clamp_score(evaluation.score);

        let answer = self.pending_answer.take().unwrap_or_else(|| text.to_string());
        self.answers.push(answer.clone());
        self.evaluations.push(evaluation.clone());

        info!(
            session_id = %self.id,
            question_number,
            score = evaluation.score,
            fallback = evaluation.fallback,
            "Answer evaluated"
        );
        self.sinks
            .record_answer(&AnswerLogEntry {
                session_id: self.id.clone(),
                question_number,
                question: self.questions.last().cloned().unwrap_or_default(),
                answer,
                score: evaluation.score,
                timestamp: Utc::now(),
            })
            .await;

        self.advance(evaluation).await
    }

    /// Moves past a committed answer: completes the interview or issues the
    /// next question.
    async fn advance(&mut self, evaluation: AnswerEvaluation) -> Result<SubmitOutcome> {
        if self.current_question_number() >= self.config.total_questions {
            let report = self.finalize().await?;
            return Ok(SubmitOutcome::Completed { evaluation, report });
        }

        let question = self.request_question().await?;
        self.questions.push(question.clone());

        Ok(SubmitOutcome::Next {
            question,
            question_number: self.current_question_number(),
            total_questions: self.config.total_questions,
            evaluation,
        })
    }

    /// Ends the interview and returns its report.
    ///
    /// Runs automatically after the last answer and may be called earlier to
    /// end the interview; only fully evaluated answers are included. The report
    /// is built and handed to the sinks once; later calls return the cached
    /// copy. The session becomes `Completed` only once the report is built: if
    /// the final feedback call fails nothing changes, and either this call or a
    /// resubmitted last answer tries again.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a session that never started, and evaluator
    /// errors unchanged.
    pub async fn finalize(&mut self) -> Result<Report> {
        if self.status == SessionStatus::Created {
            return Err(InterviewError::invalid_state("finalize", self.status));
        }
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        self.touch();
        let ended_at = Utc::now();

        let history = self.history();
        let scores: Vec<f64> = history.iter().map(|qa| qa.score).collect();
        let summary = aggregate(&scores);

        let feedback = self
            .evaluator
            .generate_final_feedback(&FeedbackRequest {
                job_description: &self.config.job_description,
                candidate: &self.candidate,
                history: &history,
                average_score: summary.average,
            })
            .await?;

        let report = Report::builder()
            .session_id(self.id.clone())
            .candidate(self.candidate.name.clone(), self.candidate.experience_years)
            .job_description(self.config.job_description.clone())
            .difficulty(self.config.difficulty)
            .total_questions(self.config.total_questions)
            .entries(history)
            .feedback(feedback)
            .timestamps(self.started_at, ended_at)
            .build()?;
        self.complete(ended_at);

        info!(
            session_id = %self.id,
            answered = report.answered_count(),
            average_score = report.average_score,
            recommendation = %report.hire_recommendation,
            "Interview completed"
        );

        self.report = Some(report.clone());
        self.sinks.deliver(&report).await;
        Ok(report)
    }

    /// Returns the cached report, if the interview has been finalized.
    #[must_use]
    pub const fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Returns a read-only projection of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let scores: Vec<f64> = self.evaluations.iter().map(|e| e.score).collect();
        let average_score = aggregate(&scores).average;

        SessionSnapshot {
            session_id: self.id.clone(),
            status: self.status,
            started: self.started_at.is_some(),
            ended: self.status == SessionStatus::Completed,
            candidate_name: self.candidate.name.clone(),
            experience_years: self.candidate.experience_years,
            difficulty: self.config.difficulty,
            total_questions: self.config.total_questions,
            current_question_number: self.current_question_number(),
            current_question: self.current_question().map(ToString::to_string),
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            scores,
            evaluations: self.evaluations.clone(),
            has_pending_answer: self.pending_answer.is_some(),
            average_score,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    fn complete(&mut self, ended_at: DateTime<Utc>) {
        if self.status == SessionStatus::Completed {
            return;
        }
        if self.pending_answer.take().is_some() {
            warn!(session_id = %self.id, "Discarding unevaluated answer at interview end");
        }
        self.status = SessionStatus::Completed;
        self.ended_at = Some(ended_at);
    }

    async fn request_question(&self) -> Result<String> {
        let question_number = self.current_question_number() + 1;
        self.evaluator
            .generate_question(&QuestionRequest {
                job_description: &self.config.job_description,
                candidate: &self.candidate,
                prior_questions: &self.questions,
                prior_answers: &self.answers,
                question_number,
                total_questions: self.config.total_questions,
                difficulty: self.config.difficulty,
            })
            .await
    }

    /// Completed questions with their answers and evaluations.
    fn history(&self) -> Vec<QuestionAnswer> {
        self.questions
            .iter()
            .zip(&self.answers)
            .zip(&self.evaluations)
            .enumerate()
            .map(|(i, ((question, answer), evaluation))| QuestionAnswer {
                question_number: u32::try_from(i + 1).unwrap_or(u32::MAX),
                question: question.clone(),
                answer: answer.clone(),
                score: evaluation.score,
                evaluation: evaluation.clone(),
            })
            .collect()
    }
}
