//! Integration tests for complete interviews over the HTTP API.
//!
//! These tests run the real router on a local port with a scripted evaluator
//! and file-backed sinks in a temporary directory.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{spawn_test_server, ScriptedEvaluator};
use interviewer_engine::{Config, ReportSinks, StorageMode};
use interviewer_store::{JsonFileStore, ReportStore, SheetExporter, SHEET_HEADERS};
use serde_json::{json, Value};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/interviewer.json")
}

async fn post(client: &reqwest::Client, url: &str, body: Value) -> (u16, Value) {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("Request failed");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Response was not JSON");
    (status, body)
}

async fn get(client: &reqwest::Client, url: &str) -> (u16, Value) {
    let response = client.get(url).send().await.expect("Request failed");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Response was not JSON");
    (status, body)
}

// ============================================================================
// Configuration
// ============================================================================

/// Tests that the sample configuration loads and validates.
#[test]
fn test_sample_config_loads() {
    let config = Config::load_from_file(&fixture_path()).expect("Failed to load fixture");

    assert_eq!(config.total_questions, 3);
    assert_eq!(config.evaluator.model, "gemini-1.5-pro");
    assert_eq!(config.evaluator.api_key_env, "INTERVIEWER_TEST_KEY");
    assert_eq!(config.storage_mode, StorageMode::Both);
    assert_eq!(config.sheet_name, "Hiring Pipeline");
    assert!(config.session_ttl().is_none());
    assert_eq!(config.allowed_origins, vec!["*"]);
}

// ============================================================================
// Full interview
// ============================================================================

/// Runs a two-question interview end to end and checks every sink.
#[tokio::test]
async fn test_full_interview_persists_and_exports() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(
        JsonFileStore::open(dir.path().join("data"))
            .await
            .expect("Failed to open store"),
    );
    let exporter = SheetExporter::new(dir.path().join("exports"));
    let sheet_path = exporter.sheet_path("Hiring Pipeline");
    let sinks = ReportSinks::none()
        .with_store(store.clone())
        .with_export(Arc::new(exporter), "Hiring Pipeline");

    let server = spawn_test_server(ScriptedEvaluator::with_scores(&[8.0, 6.0]), sinks).await;
    let client = reqwest::Client::new();

    let (status, started) = post(
        &client,
        &server.http_url("/api/start-interview"),
        json!({
            "job_description": "Rust backend",
            "candidate_name": "Linus",
            "experience_years": 12,
            "difficulty": "advanced",
            "total_questions": 2
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(started["question"], "Question 1 about Rust backend?");
    let session_id = started["session_id"].as_str().expect("session_id").to_string();

    let (status, next) = post(
        &client,
        &server.http_url("/api/submit-answer"),
        json!({ "session_id": session_id, "answer": "Axum and Tokio" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(next["status"], "in_progress");
    assert_eq!(next["question_number"], 2);
    assert_eq!(next["evaluation"]["rationale"], "Heard: Axum and Tokio");

    let (status, done) = post(
        &client,
        &server.http_url("/api/submit-answer"),
        json!({ "session_id": session_id, "answer": "Postgres with sqlx" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(done["status"], "completed");

    let report = &done["report"];
    assert_eq!(report["questions_and_answers"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["individual_scores"], json!([8.0, 6.0]));
    assert_eq!(report["average_score"], 7.0);
    assert_eq!(report["hire_recommendation"], "strong yes");
    assert_eq!(report["summary"], "Linus averaged 7.0");

    // Local store
    let stored = store
        .find_by_id(&session_id)
        .await
        .expect("Store read failed")
        .expect("Report was not stored");
    assert_eq!(stored.candidate_name, "Linus");
    assert!(dir.path().join("data/job_descriptions.json").exists());
    assert!(dir.path().join("data/answers.json").exists());

    // Sheet export
    let sheet = std::fs::read_to_string(&sheet_path).expect("Sheet was not written");
    let mut lines = sheet.lines();
    assert_eq!(lines.next(), Some(SHEET_HEADERS.join(",").as_str()));
    let row = lines.next().expect("Missing report row");
    assert!(row.starts_with(&session_id));
    assert!(row.contains("strong yes"));

    // Data API
    let (status, stats) = get(&client, &server.http_url("/api/data/statistics")).await;
    assert_eq!(status, 200);
    assert_eq!(stats["total_interviews"], 1);
    assert_eq!(stats["total_answers"], 2);

    let (status, listed) = get(&client, &server.http_url("/api/data/interviews")).await;
    assert_eq!(status, 200);
    assert_eq!(listed["total"], 1);

    // Ending a completed interview returns the same report and releases it
    let (status, ended) = post(
        &client,
        &server.http_url("/api/end-interview"),
        json!({ "session_id": session_id }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(ended["report"], *report);
    assert_eq!(store.list_all().await.expect("Store read failed").len(), 1);

    let (status, _) = get(
        &client,
        &server.http_url(&format!("/api/interview/{session_id}/state")),
    )
    .await;
    assert_eq!(status, 404);
}

/// Tests that concurrent interviews on one server stay separate.
#[tokio::test]
async fn test_concurrent_interviews_are_isolated() {
    let server = spawn_test_server(ScriptedEvaluator::default(), ReportSinks::none()).await;
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for i in 0..6 {
        let client = client.clone();
        let start_url = server.http_url("/api/start-interview");
        let submit_url = server.http_url("/api/submit-answer");
        tasks.push(tokio::spawn(async move {
            let (_, started) = post(
                &client,
                &start_url,
                json!({
                    "job_description": format!("Role {i}"),
                    "candidate_name": format!("Candidate {i}"),
                    "total_questions": 2
                }),
            )
            .await;
            let session_id = started["session_id"].as_str().expect("session_id").to_string();

            for n in 1..=2 {
                post(
                    &client,
                    &submit_url,
                    json!({ "session_id": session_id, "answer": format!("answer {n} from {i}") }),
                )
                .await;
            }
            (i, session_id)
        }));
    }

    for task in tasks {
        let (i, session_id) = task.await.expect("Task failed");
        let state = server
            .service
            .get_state(&session_id)
            .await
            .expect("Session missing");
        assert_eq!(state.candidate_name, format!("Candidate {i}"));
        assert_eq!(
            state.answers,
            vec![format!("answer 1 from {i}"), format!("answer 2 from {i}")]
        );
        assert_eq!(state.questions[0], format!("Question 1 about Role {i}?"));
    }
}

/// Tests error responses for misuse of the API.
#[tokio::test]
async fn test_error_responses() {
    let server = spawn_test_server(ScriptedEvaluator::default(), ReportSinks::none()).await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        &server.http_url("/api/start-interview"),
        json!({ "job_description": "" }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());

    let (status, _) = post(
        &client,
        &server.http_url("/api/submit-answer"),
        json!({ "session_id": "missing", "answer": "hi" }),
    )
    .await;
    assert_eq!(status, 404);

    let (status, body) = get(&client, &server.http_url("/api/data/interviews")).await;
    assert_eq!(status, 400);
    assert!(body["error"]
        .as_str()
        .is_some_and(|e| e.contains("storage is disabled")));

    let (status, health) = get(&client, &server.http_url("/api/health")).await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "healthy");
}
