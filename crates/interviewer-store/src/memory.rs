//! In-process store.

use async_trait::async_trait;
use interviewer_report::Report;
use tokio::sync::RwLock;

use crate::{AnswerLogEntry, JobDescriptionEntry, ReportStore, Result};

/// Keeps everything in memory; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    reports: RwLock<Vec<Report>>,
    job_descriptions: RwLock<Vec<JobDescriptionEntry>>,
    answers: RwLock<Vec<AnswerLogEntry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded job descriptions.
    pub async fn job_descriptions(&self) -> Vec<JobDescriptionEntry> {
        self.job_descriptions.read().await.clone()
    }

    /// Returns the recorded answers.
    pub async fn answers(&self) -> Vec<AnswerLogEntry> {
        self.answers.read().await.clone()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn save_report(&self, report: &Report) -> Result<()> {
        self.reports.write().await.push(report.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Report>> {
        let reports = self.reports.read().await;
        Ok(reports.iter().find(|r| r.session_id == session_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Report>> {
        Ok(self.reports.read().await.clone())
    }

    async fn save_job_description(&self, entry: &JobDescriptionEntry) -> Result<()> {
        self.job_descriptions.write().await.push(entry.clone());
        Ok(())
    }

    async fn save_answer(&self, entry: &AnswerLogEntry) -> Result<()> {
        self.answers.write().await.push(entry.clone());
        Ok(())
    }
}
