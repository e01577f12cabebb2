//! Transport-independent entry points for running interviews.
//!
//! [`InterviewService`] is what the HTTP and WebSocket layers call. It owns
//! the session registry, publishes an [`InterviewEvent`] for every change,
//! and exposes the read API over stored reports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use interviewer_report::Report;
use interviewer_store::{ReportStore, Statistics};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{InterviewError, Result};
use crate::evaluator::Evaluator;
use crate::events::{EventBroadcaster, InterviewEvent};
use crate::registry::SessionRegistry;
use crate::session::{ReportSinks, SessionConfig, SessionSnapshot, SubmitOutcome};

/// Result of [`InterviewService::start_session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedSession {
    /// Identifier of the new session.
    pub session_id: String,
    /// The first question.
    pub question: String,
    /// Always 1.
    pub question_number: u32,
    /// Number of questions in the interview.
    pub total_questions: u32,
}

/// Runs interviews on behalf of the transports.
pub struct InterviewService {
    registry: SessionRegistry,
    evaluator: Arc<dyn Evaluator>,
    events: EventBroadcaster,
    evaluator_ready: AtomicBool,
}

impl std::fmt::Debug for InterviewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterviewService")
            .field("registry", &self.registry)
            .field("evaluator_ready", &self.evaluator_ready)
            .finish_non_exhaustive()
    }
}

impl InterviewService {
    /// Creates a service whose sessions use `evaluator` and write to `sinks`.
    #[must_use]
    pub fn new(evaluator: Arc<dyn Evaluator>, sinks: ReportSinks) -> Self {
        Self {
            registry: SessionRegistry::new(Arc::clone(&evaluator), sinks),
            evaluator,
            events: EventBroadcaster::default(),
            evaluator_ready: AtomicBool::new(false),
        }
    }

    /// Returns the session registry.
    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Returns the event broadcaster.
    #[must_use]
    pub const fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    // ========================================================================
    // Interview operations
    // ========================================================================

    /// Creates a session and asks its first question.
    ///
    /// If the first question cannot be generated the session is discarded.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a bad configuration and evaluator errors
    /// unchanged.
    pub async fn start_session(&self, config: SessionConfig) -> Result<StartedSession> {
        let total_questions = config.total_questions;
        let session_id = self.registry.create(config).await?;
        let handle = self.registry.get(&session_id).await?;

        let question = {
            let mut session = handle.lock().await;
            session.ask_first().await
        };
        let question = match question {
            Ok(question) => question,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to start interview");
                self.registry.remove(&session_id).await;
                return Err(e);
            }
        };

        self.events.send(InterviewEvent::question(
            session_id.clone(),
            question.clone(),
            1,
            total_questions,
        ));

        Ok(StartedSession {
            session_id,
            question,
            question_number: 1,
            total_questions,
        })
    }

    /// Submits an answer for the session's current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id and otherwise whatever
    /// [`crate::InterviewSession::submit_answer`] returns.
    pub async fn submit_answer(&self, session_id: &str, text: &str) -> Result<SubmitOutcome> {
        let handle = self.registry.get(session_id).await?;
        let (outcome, answered) = {
            let mut session = handle.lock().await;
            let outcome = session.submit_answer(text).await?;
            (outcome, session.answered_count())
        };

        self.events.send(InterviewEvent::evaluation(
            session_id,
            answered,
            outcome.evaluation().clone(),
        ));
        match &outcome {
            SubmitOutcome::Next {
                question,
                question_number,
                total_questions,
                ..
            } => {
                self.events.send(InterviewEvent::question(
                    session_id,
                    question.clone(),
                    *question_number,
                    *total_questions,
                ));
            }
            SubmitOutcome::Completed { report, .. } => {
                self.events
                    .send(InterviewEvent::interview_complete(report.clone()));
            }
        }

        Ok(outcome)
    }

    /// Ends the interview, returns its report, and releases the session.
    ///
    /// `interview_complete` is broadcast only if this call produced the
    /// report; a session completed by its last answer already announced it.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id, `InvalidState` for a
    /// session that never started, and evaluator errors unchanged. On an
    /// evaluator error the session is kept so the call can be repeated.
    pub async fn end_session(&self, session_id: &str) -> Result<Report> {
        let handle = self.registry.get(session_id).await?;
        let (report, announced) = {
            let mut session = handle.lock().await;
            let announced = session.report().is_some();
            (session.finalize().await?, announced)
        };

        self.registry.remove(session_id).await;
        if !announced {
            self.events
                .send(InterviewEvent::interview_complete(report.clone()));
        }
        info!(session_id, "Interview ended");
        Ok(report)
    }

    /// Returns a snapshot of the session.
    ///
    /// Waits for any operation already in flight on that session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id.
    pub async fn get_state(&self, session_id: &str) -> Result<SessionSnapshot> {
        let handle = self.registry.get(session_id).await?;
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    // ========================================================================
    // Stored data
    // ========================================================================

    fn store(&self) -> Result<&Arc<dyn ReportStore>> {
        self.registry
            .sinks()
            .store()
            .ok_or(InterviewError::StorageDisabled)
    }

    /// Returns `true` if a local store is configured.
    #[must_use]
    pub fn storage_enabled(&self) -> bool {
        self.registry.sinks().store().is_some()
    }

    /// Lists every stored report.
    ///
    /// # Errors
    ///
    /// Returns `StorageDisabled` without a local store, or the store's error.
    pub async fn list_interviews(&self) -> Result<Vec<Report>> {
        Ok(self.store()?.list_all().await?)
    }

    /// Finds a stored report by session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageDisabled` without a local store, or the store's error.
    pub async fn find_interview(&self, session_id: &str) -> Result<Option<Report>> {
        Ok(self.store()?.find_by_id(session_id).await?)
    }

    /// Computes statistics over stored reports.
    ///
    /// # Errors
    ///
    /// Returns `StorageDisabled` without a local store, or the store's error.
    pub async fn statistics(&self) -> Result<Statistics> {
        Ok(self.store()?.statistics().await?)
    }

    // ========================================================================
    // Evaluator readiness and housekeeping
    // ========================================================================

    /// Returns `true` once the evaluator has answered a probe.
    #[must_use]
    pub fn evaluator_ready(&self) -> bool {
        self.evaluator_ready.load(Ordering::Relaxed)
    }

    /// Sends a probe request to the evaluator and records whether it answered.
    ///
    /// A failed probe is logged; interviews can still be attempted.
    pub async fn probe_evaluator(&self) -> bool {
        let ready = match self.evaluator.probe().await {
            Ok(()) => {
                info!("Evaluator is ready");
                true
            }
            Err(e) => {
                warn!(error = %e, "Evaluator probe failed; will retry on first use");
                false
            }
        };
        self.evaluator_ready.store(ready, Ordering::Relaxed);
        ready
    }

    /// Spawns a task that evicts sessions idle longer than `ttl` every `period`.
    pub fn spawn_idle_sweeper(self: &Arc<Self>, ttl: Duration, period: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.registry.evict_idle(ttl).await;
            }
        })
    }
}
