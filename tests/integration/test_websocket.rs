//! Integration tests for the WebSocket interview channel.
//!
//! These tests validate connection handling, driving an interview over the
//! socket, and forwarding of progress made over HTTP.

mod common;

use std::time::Duration;

use common::{spawn_test_server, ScriptedEvaluator, TestServer};
use futures::{SinkExt, StreamExt};
use interviewer_engine::{InterviewEvent, ReportSinks, SessionConfig, SessionStatus};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects a WebSocket client to the given URL.
async fn connect_client(url: &str) -> WsClient {
    let (ws_stream, _) = connect_async(url)
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Receives the next text message and parses it as an `InterviewEvent`.
/// Answers ping frames while waiting.
async fn receive_event(client: &mut WsClient) -> InterviewEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

/// Sends a JSON command.
async fn send_command(client: &mut WsClient, command: serde_json::Value) {
    client
        .send(Message::Text(command.to_string()))
        .await
        .expect("Failed to send command");
}

/// Starts a session directly through the service.
async fn start_session(server: &TestServer, total_questions: u32) -> String {
    server
        .service
        .start_session(SessionConfig {
            total_questions,
            ..SessionConfig::new("Platform engineer")
        })
        .await
        .expect("Failed to start session")
        .session_id
}

// ============================================================================
// Connection Tests
// ============================================================================

/// Tests that a client receives the session state on connect.
#[tokio::test]
async fn test_client_receives_connected_event_on_connect() {
    let server = spawn_test_server(ScriptedEvaluator::default(), ReportSinks::none()).await;
    let session_id = start_session(&server, 3).await;

    let mut client = connect_client(&server.ws_url(&session_id)).await;
    let event = receive_event(&mut client).await;

    let InterviewEvent::Connected(payload) = event else {
        panic!("Expected Connected event, got: {event:?}");
    };
    assert_eq!(payload.state.session_id, session_id);
    assert_eq!(payload.state.status, SessionStatus::InProgress);
    assert_eq!(
        payload.state.current_question.as_deref(),
        Some("Question 1 about Platform engineer?")
    );
}

/// Tests that connecting to an unknown session yields an error and a close.
#[tokio::test]
async fn test_unknown_session_gets_error() {
    let server = spawn_test_server(ScriptedEvaluator::default(), ReportSinks::none()).await;

    let mut client = connect_client(&server.ws_url("no-such-session")).await;
    let event = receive_event(&mut client).await;

    let InterviewEvent::Error(payload) = event else {
        panic!("Expected Error event, got: {event:?}");
    };
    assert!(payload.message.contains("no-such-session"));
}

// ============================================================================
// Interview over the socket
// ============================================================================

/// Drives a complete interview through WebSocket commands.
#[tokio::test]
async fn test_interview_over_websocket() {
    let server =
        spawn_test_server(ScriptedEvaluator::with_scores(&[9.0, 7.0]), ReportSinks::none()).await;
    let session_id = start_session(&server, 2).await;

    let mut client = connect_client(&server.ws_url(&session_id)).await;
    assert_eq!(receive_event(&mut client).await.event_name(), "connected");

    send_command(&mut client, json!({ "type": "answer", "text": "Kubernetes operators" })).await;

    let InterviewEvent::Evaluation(evaluation) = receive_event(&mut client).await else {
        panic!("Expected evaluation event");
    };
    assert_eq!(evaluation.question_number, 1);
    assert!((evaluation.evaluation.score - 9.0).abs() < f64::EPSILON);

    let InterviewEvent::Question(question) = receive_event(&mut client).await else {
        panic!("Expected question event");
    };
    assert_eq!(question.question_number, 2);
    assert_eq!(question.total_questions, 2);

    send_command(&mut client, json!({ "type": "answer", "text": "Terraform modules" })).await;
    assert_eq!(receive_event(&mut client).await.event_name(), "evaluation");

    let InterviewEvent::InterviewComplete(complete) = receive_event(&mut client).await else {
        panic!("Expected interview_complete event");
    };
    assert_eq!(complete.report.session_id, session_id);
    assert!((complete.report.average_score - 8.0).abs() < f64::EPSILON);

    send_command(&mut client, json!({ "type": "state" })).await;
    let InterviewEvent::State(state) = receive_event(&mut client).await else {
        panic!("Expected state event");
    };
    assert_eq!(state.state.status, SessionStatus::Completed);
}

/// Tests that bad commands are answered with error events.
#[tokio::test]
async fn test_bad_commands_get_error_events() {
    let server = spawn_test_server(ScriptedEvaluator::default(), ReportSinks::none()).await;
    let session_id = start_session(&server, 2).await;

    let mut client = connect_client(&server.ws_url(&session_id)).await;
    receive_event(&mut client).await;

    client
        .send(Message::Text("{not json".to_string()))
        .await
        .expect("Failed to send");
    assert_eq!(receive_event(&mut client).await.event_name(), "error");

    send_command(&mut client, json!({ "type": "answer", "text": "   " })).await;
    assert_eq!(receive_event(&mut client).await.event_name(), "error");

    send_command(&mut client, json!({ "type": "audio", "data": "UklGRg==", "format": "wav" })).await;
    let InterviewEvent::Error(payload) = receive_event(&mut client).await else {
        panic!("Expected error event for audio");
    };
    assert!(payload.message.contains("Speech-to-text"));
}

// ============================================================================
// Forwarding
// ============================================================================

/// Tests that progress made over HTTP reaches WebSocket observers of that
/// session only.
#[tokio::test]
async fn test_http_progress_is_forwarded_to_observers() {
    let server = spawn_test_server(ScriptedEvaluator::default(), ReportSinks::none()).await;
    let watched = start_session(&server, 3).await;
    let other = start_session(&server, 3).await;

    let mut observer1 = connect_client(&server.ws_url(&watched)).await;
    let mut observer2 = connect_client(&server.ws_url(&watched)).await;
    receive_event(&mut observer1).await;
    receive_event(&mut observer2).await;

    let client = reqwest::Client::new();
    for session_id in [&other, &watched] {
        let response = client
            .post(server.http_url("/api/submit-answer"))
            .json(&json!({ "session_id": session_id, "answer": "Over HTTP" }))
            .send()
            .await
            .expect("Request failed");
        assert!(response.status().is_success());
    }

    for observer in [&mut observer1, &mut observer2] {
        let event = receive_event(observer).await;
        assert_eq!(event.event_name(), "evaluation");
        assert_eq!(event.session_id(), Some(watched.as_str()));
        let event = receive_event(observer).await;
        assert_eq!(event.event_name(), "question");
        assert_eq!(event.session_id(), Some(watched.as_str()));
    }
}

/// Tests that ending over the socket publishes the report and releases the
/// session.
#[tokio::test]
async fn test_end_over_websocket() {
    let server = spawn_test_server(ScriptedEvaluator::default(), ReportSinks::none()).await;
    let session_id = start_session(&server, 5).await;

    let mut client = connect_client(&server.ws_url(&session_id)).await;
    receive_event(&mut client).await;

    send_command(&mut client, json!({ "type": "end" })).await;
    let InterviewEvent::InterviewComplete(complete) = receive_event(&mut client).await else {
        panic!("Expected interview_complete event");
    };
    assert_eq!(complete.report.answered_count(), 0);
    assert_eq!(complete.report.total_questions, 5);

    assert!(server.service.get_state(&session_id).await.is_err());
}
