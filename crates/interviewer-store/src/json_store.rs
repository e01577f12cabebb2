//! JSON-file persistence for completed interviews.
//!
//! Layout under the storage directory:
//!
//! - `interviews.json` - array of [`Report`]s
//! - `job_descriptions.json` - array of [`JobDescriptionEntry`]s
//! - `answers.json` - array of [`AnswerLogEntry`]s
//!
//! Appends are serialized through one async mutex and land on disk through a
//! temporary file plus rename, so readers never observe a half-written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use interviewer_report::Report;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{AnswerLogEntry, JobDescriptionEntry, ReportStore, Result, StoreError};

const INTERVIEWS_FILE: &str = "interviews.json";
const JOB_DESCRIPTIONS_FILE: &str = "job_descriptions.json";
const ANSWERS_FILE: &str = "answers.json";

/// Stores interviews as pretty-printed JSON arrays in a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !tokio::fs::try_exists(&dir).await? {
            tokio::fs::create_dir_all(&dir).await?;
            info!(dir = %dir.display(), "Created storage directory");
        }
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Reads a JSON array file; a missing file is an empty array.
    async fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.path(file);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupted {
            path,
            message: e.to_string(),
        })
    }

    /// Appends `item` to the JSON array in `file`.
    async fn append<T>(&self, file: &str, item: &T) -> Result<usize>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync,
    {
        let _guard = self.write_lock.lock().await;

        let mut items: Vec<T> = self.load(file).await?;
        items.push(item.clone());

        let json = serde_json::to_string_pretty(&items)?;
        let path = self.path(file);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(file, count = items.len(), "Appended record");
        Ok(items.len())
    }
}

#[async_trait]
impl ReportStore for JsonFileStore {
    async fn save_report(&self, report: &Report) -> Result<()> {
        let count = self.append(INTERVIEWS_FILE, report).await?;
        info!(
            session_id = %report.session_id,
            total = count,
            "Saved interview session"
        );
        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Report>> {
        let reports: Vec<Report> = self.load(INTERVIEWS_FILE).await?;
        Ok(reports.into_iter().find(|r| r.session_id == session_id))
    }

    async fn list_all(&self) -> Result<Vec<Report>> {
        self.load(INTERVIEWS_FILE).await
    }

    async fn save_job_description(&self, entry: &JobDescriptionEntry) -> Result<()> {
        self.append(JOB_DESCRIPTIONS_FILE, entry).await?;
        info!(session_id = %entry.session_id, "Saved job description");
        Ok(())
    }

    async fn save_answer(&self, entry: &AnswerLogEntry) -> Result<()> {
        self.append(ANSWERS_FILE, entry).await?;
        debug!(
            session_id = %entry.session_id,
            question_number = entry.question_number,
            "Saved answer"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tokio_test::assert_ok;

    use super::*;

    fn report(id: &str, average: f64) -> Report {
        let mut report = Report::builder().session_id(id).build().unwrap();
        report.average_score = average;
        report
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested/interview_data");

        let store = JsonFileStore::open(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let root = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(root.path()).await.unwrap();

        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.find_by_id("missing").await.unwrap().is_none());
        assert_eq!(store.statistics().await.unwrap().total_interviews, 0);
    }

    #[tokio::test]
    async fn test_save_and_find_report() {
        let root = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(root.path()).await.unwrap();

        assert_ok!(store.save_report(&report("one", 8.0)).await);
        assert_ok!(store.save_report(&report("two", 4.0)).await);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].session_id, "one");

        let found = store.find_by_id("two").await.unwrap().unwrap();
        assert!((found.average_score - 4.0).abs() < f64::EPSILON);

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total_interviews, 2);
        assert!((stats.average_score - 6.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_job_descriptions_and_answers_are_separate_files() {
        let root = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(root.path()).await.unwrap();

        store
            .save_job_description(&JobDescriptionEntry::new("s1", "Platform engineer"))
            .await
            .unwrap();
        store
            .save_answer(&AnswerLogEntry {
                session_id: "s1".to_string(),
                question_number: 1,
                question: "Why Rust?".to_string(),
                answer: "Ownership".to_string(),
                score: 7.0,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        let jobs = std::fs::read_to_string(root.path().join(JOB_DESCRIPTIONS_FILE)).unwrap();
        assert!(jobs.contains("Platform engineer"));
        let answers = std::fs::read_to_string(root.path().join(ANSWERS_FILE)).unwrap();
        assert!(answers.contains("Ownership"));
        assert!(!root.path().join(INTERVIEWS_FILE).exists());
    }

    #[tokio::test]
    async fn test_corrupted_file_is_reported() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(INTERVIEWS_FILE), "{ not an array").unwrap();
        let store = JsonFileStore::open(root.path()).await.unwrap();

        let result = store.list_all().await;
        assert!(matches!(result, Err(StoreError::Corrupted { .. })));

        // A corrupted file is never silently replaced
        assert!(store.save_report(&report("x", 1.0)).await.is_err());
        let raw = std::fs::read_to_string(root.path().join(INTERVIEWS_FILE)).unwrap();
        assert_eq!(raw, "{ not an array");
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(root.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.save_report(&report(&format!("s{i}"), 5.0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list_all().await.unwrap().len(), 16);
    }
}
