//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use interviewer_engine::{
    create_router, AnswerRequest, AppState, Config, Evaluator, FeedbackRequest, InterviewService,
    QuestionRequest, ReportSinks, Result,
};
use interviewer_report::{AnswerEvaluation, FinalFeedback};

/// Evaluator with canned questions and a queue of scores (7.0 once empty).
#[derive(Default)]
pub struct ScriptedEvaluator {
    scores: Mutex<VecDeque<f64>>,
}

impl ScriptedEvaluator {
    pub fn with_scores(scores: &[f64]) -> Self {
        let evaluator = Self::default();
        evaluator
            .scores
            .lock()
            .expect("scores lock poisoned")
            .extend(scores.iter().copied());
        evaluator
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn generate_question(&self, request: &QuestionRequest<'_>) -> Result<String> {
        Ok(format!(
            "Question {} about {}?",
            request.question_number, request.job_description
        ))
    }

    async fn evaluate_answer(&self, request: &AnswerRequest<'_>) -> Result<AnswerEvaluation> {
        let score = self
            .scores
            .lock()
            .expect("scores lock poisoned")
            .pop_front()
            .unwrap_or(7.0);
        Ok(AnswerEvaluation {
            score,
            rationale: format!("Heard: {}", request.answer),
            strengths: vec!["structure".to_string()],
            improvements: vec!["examples".to_string()],
            fallback: false,
        })
    }

    async fn generate_final_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> Result<FinalFeedback> {
        Ok(FinalFeedback {
            summary: format!(
                "{} averaged {:.1}",
                request.candidate.name, request.average_score
            ),
            strengths: vec!["clarity".to_string()],
            weaknesses: vec!["depth".to_string()],
            recommendations: vec!["system design practice".to_string()],
            fallback: false,
        })
    }
}

/// Finds an available port for testing.
pub fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// A running test server.
pub struct TestServer {
    pub addr: String,
    pub service: Arc<InterviewService>,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self, session_id: &str) -> String {
        format!("ws://{}/ws/interview/{session_id}", self.addr)
    }
}

/// Spawns the router with `evaluator` and `sinks` on an ephemeral port.
pub async fn spawn_test_server(evaluator: ScriptedEvaluator, sinks: ReportSinks) -> TestServer {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");

    let service = Arc::new(InterviewService::new(Arc::new(evaluator), sinks));
    let router = create_router(AppState::new(Config::default(), Arc::clone(&service)));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        service,
        handle,
    }
}
