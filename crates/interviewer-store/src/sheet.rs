//! Spreadsheet export.
//!
//! Each report becomes one row of a CSV sheet at `{export_dir}/{destination}.csv`.
//! The header row is written when the sheet is first created. List-valued
//! columns (questions, answers, scores) are JSON-encoded into a single cell.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use interviewer_report::Report;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::{ExportSink, Result, StoreError};

/// Column headers of the export sheet, in order.
pub const SHEET_HEADERS: [&str; 10] = [
    "Session ID",
    "Timestamp",
    "Candidate Name",
    "Experience Years",
    "Average Score",
    "Hire Recommendation",
    "Job Description",
    "Questions",
    "Answers",
    "Scores",
];

/// Maximum number of characters of the job description kept in a row.
pub const JOB_DESCRIPTION_CELL_LIMIT: usize = 500;

/// Appends report rows to CSV sheets in an export directory.
#[derive(Debug)]
pub struct SheetExporter {
    export_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SheetExporter {
    /// Creates an exporter writing under `export_dir`.
    ///
    /// The directory is created on first export.
    #[must_use]
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the path of the sheet called `destination`.
    #[must_use]
    pub fn sheet_path(&self, destination: &str) -> PathBuf {
        self.export_dir.join(format!("{}.csv", sanitize_name(destination)))
    }

    /// Returns the export directory.
    #[must_use]
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Builds the cells of one sheet row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Json` if a list cell cannot be encoded.
    pub fn row(report: &Report) -> Result<Vec<String>> {
        let questions: Vec<&str> = report.questions().collect();
        let answers: Vec<&str> = report.answers().collect();

        Ok(vec![
            report.session_id.clone(),
            report.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            report.candidate_name.clone(),
            report.candidate_experience.to_string(),
            format!("{:.2}", report.average_score),
            report.hire_recommendation.label().to_string(),
            truncate_chars(&report.job_description, JOB_DESCRIPTION_CELL_LIMIT),
            serde_json::to_string(&questions)?,
            serde_json::to_string(&answers)?,
            serde_json::to_string(&report.individual_scores)?,
        ])
    }
}

#[async_trait]
impl ExportSink for SheetExporter {
    async fn export(&self, report: &Report, destination: &str) -> Result<()> {
        let row = Self::row(report)?;
        let path = self.sheet_path(destination);

        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|e| export_error(destination, &e))?;

        let is_new = !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| export_error(destination, &e))?;

        let mut contents = String::new();
        if is_new {
            contents.push_str(&csv_line(SHEET_HEADERS.iter().copied()));
        }
        contents.push_str(&csv_line(row.iter().map(String::as_str)));

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| export_error(destination, &e))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| export_error(destination, &e))?;
        file.flush()
            .await
            .map_err(|e| export_error(destination, &e))?;

        info!(
            session_id = %report.session_id,
            sheet = %path.display(),
            "Exported interview to sheet"
        );
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn export_error(destination: &str, err: &std::io::Error) -> StoreError {
    StoreError::Export {
        destination: destination.to_string(),
        message: err.to_string(),
    }
}

/// Keeps a sheet name from escaping the export directory.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            _ => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "export".to_string()
    } else {
        cleaned
    }
}

/// Returns at most `limit` characters of `text`.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Quotes one CSV field when it contains a delimiter, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields.map(csv_field).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}
