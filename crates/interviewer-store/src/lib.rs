//! Interview Persistence and Export
//!
//! Sinks that receive completed interview reports. The engine consumes them
//! through two narrow traits:
//!
//! - [`ReportStore`] - durable storage with read-back and statistics
//! - [`ExportSink`] - optional one-way export to a named destination
//!
//! Both are best-effort from the engine's perspective: a failure is logged by
//! the caller and never invalidates a report that was already computed.
//! Implementations must be safe to share across concurrently running
//! interviews.
//!
//! # Implementations
//!
//! - [`JsonFileStore`] - JSON files in a storage directory
//! - [`MemoryStore`] - in-process store, useful for tests and ephemeral runs
//! - [`SheetExporter`] - appends one spreadsheet row per report

mod json_store;
mod memory;
mod sheet;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;
pub use sheet::{SheetExporter, JOB_DESCRIPTION_CELL_LIMIT, SHEET_HEADERS};

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interviewer_report::Report;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in a persistence or export sink.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write a storage file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A storage file exists but does not hold the expected data.
    #[error("corrupted storage file '{path}': {message}")]
    Corrupted {
        /// Path to the unreadable file.
        path: PathBuf,
        /// Description of the parse failure.
        message: String,
    },

    /// The export destination rejected the report.
    #[error("export to '{destination}' failed: {message}")]
    Export {
        /// Name of the destination.
        destination: String,
        /// Description of the failure.
        message: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Aggregate figures over every stored report.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of stored interviews.
    pub total_interviews: usize,
    /// Mean of the stored reports' average scores (0 when empty).
    pub average_score: f64,
    /// Number of questions across all stored reports.
    pub total_questions: usize,
    /// Number of answers across all stored reports.
    pub total_answers: usize,
}

impl Statistics {
    /// Computes statistics from a set of reports.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_reports(reports: &[Report]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }

        let total_questions: usize = reports.iter().map(Report::answered_count).sum();
        let score_sum: f64 = reports.iter().map(|r| r.average_score).sum();

        Self {
            total_interviews: reports.len(),
            average_score: score_sum / reports.len() as f64,
            total_questions,
            total_answers: total_questions,
        }
    }
}

/// A job description recorded when an interview starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptionEntry {
    /// Session the description belongs to.
    pub session_id: String,
    /// The job posting text.
    pub job_description: String,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

impl JobDescriptionEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(session_id: impl Into<String>, job_description: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            job_description: job_description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One evaluated answer, recorded as the interview progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerLogEntry {
    /// Session the answer belongs to.
    pub session_id: String,
    /// Position of the question (1-indexed).
    pub question_number: u32,
    /// The question asked.
    pub question: String,
    /// The candidate's answer.
    pub answer: String,
    /// Score given to the answer.
    pub score: f64,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Durable storage for completed interviews.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Appends a completed report.
    async fn save_report(&self, report: &Report) -> Result<()>;

    /// Returns the report for `session_id`, if stored.
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Report>>;

    /// Returns every stored report in insertion order.
    async fn list_all(&self) -> Result<Vec<Report>>;

    /// Records the job description of a newly started interview.
    async fn save_job_description(&self, entry: &JobDescriptionEntry) -> Result<()>;

    /// Records one evaluated answer.
    async fn save_answer(&self, entry: &AnswerLogEntry) -> Result<()>;

    /// Returns aggregate figures over every stored report.
    async fn statistics(&self) -> Result<Statistics> {
        let reports = self.list_all().await?;
        Ok(Statistics::from_reports(&reports))
    }
}

/// One-way export of completed interviews to a named destination.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Exports `report` to the destination called `destination`.
    async fn export(&self, report: &Report, destination: &str) -> Result<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use interviewer_report::{AnswerEvaluation, QuestionAnswer};

    fn report_with(id: &str, scores: &[f64]) -> Report {
        let mut builder = Report::builder().session_id(id);
        for (i, score) in scores.iter().enumerate() {
            let number = u32::try_from(i + 1).unwrap();
            builder = builder.entry(QuestionAnswer {
                question_number: number,
                question: format!("Q{number}"),
                answer: format!("A{number}"),
                score: *score,
                evaluation: AnswerEvaluation {
                    score: *score,
                    ..AnswerEvaluation::default()
                },
            });
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_statistics_empty() {
        let stats = Statistics::from_reports(&[]);
        assert_eq!(stats, Statistics::default());
    }

    #[test]
    fn test_statistics_over_reports() {
        let reports = vec![report_with("a", &[8.0, 6.0]), report_with("b", &[4.0])];
        let stats = Statistics::from_reports(&reports);

        assert_eq!(stats.total_interviews, 2);
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.total_answers, 3);
        assert!((stats.average_score - 5.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Corrupted {
            path: PathBuf::from("/data/interviews.json"),
            message: "expected array".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/interviews.json"));
        assert!(msg.contains("expected array"));
    }
}
