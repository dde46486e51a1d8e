//! End-to-end runs over HTTP against a mock backend.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tether::agent_loop::{ExecutionLoop, RunStatus};
use tether::config::{LoopSettings, TetherConfig};
use tether::error::TetherError;
use tether::models::{ModelId, ProviderKind};
use tether::orchestrator::{Orchestrator, RunMode};
use tether::provider::create_backend;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn no_retry() -> LoopSettings {
    LoopSettings {
        max_retries: 0,
        ..LoopSettings::default()
    }
}

fn config_for(provider: ProviderKind, server: &MockServer) -> TetherConfig {
    let config = TetherConfig::new();
    config.set_api_key(provider, "test-key");
    config.set_base_url(provider, server.uri());
    config
}

#[tokio::test]
async fn openai_tool_loop_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("tool_call_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_final("2 + 3 = 5")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_tool_calls(&[(
            "call_1",
            "add",
            json!({"a": 2, "b": 3}),
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let model: ModelId = "openai:gpt-4o-mini".parse().unwrap();
    let client = create_backend(&model, &config_for(ProviderKind::OpenAi, &server), &no_retry()).unwrap();
    let registry = registry(vec![add_tool()]);

    let outcome = ExecutionLoop::new(&client, &registry)
        .run_goal(None, "What is 2 + 3?")
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.text, "2 + 3 = 5");
    assert_eq!(outcome.tool_results.len(), 1);
}

#[tokio::test]
async fn anthropic_requests_carry_version_and_key_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Hello."}],
            "usage": {"input_tokens": 3, "output_tokens": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model: ModelId = "anthropic:claude-sonnet-4".parse().unwrap();
    let client =
        create_backend(&model, &config_for(ProviderKind::Anthropic, &server), &no_retry()).unwrap();
    let registry = registry(vec![]);

    let report = Orchestrator::new(&client, &registry).run("Say hello").await.unwrap();
    assert_eq!(report.mode, RunMode::ToolLoop);
    assert_eq!(report.text, "Hello.");
    assert_eq!(report.usage.total_tokens, 5);
}

#[tokio::test]
async fn ollama_runs_through_the_planning_bridge() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("outputs ONLY valid JSON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply(
            r#"[{"tool_name": "add", "args": {"a": 4, "b": 5}, "purpose": "sum"}]"#,
        )))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("4 + 5 = 9")))
        .expect(1)
        .mount(&server)
        .await;

    let config = TetherConfig::new();
    config.set_base_url(ProviderKind::Ollama, server.uri());
    let model: ModelId = "ollama:llama3.1".parse().unwrap();
    let client = create_backend(&model, &config, &no_retry()).unwrap();
    let registry = registry(vec![add_tool()]);

    let report = Orchestrator::new(&client, &registry).run("What is 4 + 5?").await.unwrap();
    assert_eq!(report.mode, RunMode::Planning);
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.text, "4 + 5 = 9");
    assert_eq!(report.executed_calls.len(), 1);
    assert_eq!(report.executed_calls[0].call_id, "plan-1");
    assert_eq!(report.executed_calls[0].payload(), "9");
}

#[tokio::test]
async fn unauthorized_responses_map_to_authentication_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let model: ModelId = "groq:llama-3.3-70b-versatile".parse().unwrap();
    let client = create_backend(&model, &config_for(ProviderKind::Groq, &server), &no_retry()).unwrap();
    let registry = registry(vec![]);

    let err = ExecutionLoop::new(&client, &registry)
        .run_goal(None, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, TetherError::Authentication(msg) if msg == "invalid api key"));
}

#[tokio::test]
async fn rate_limits_carry_the_retry_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"error": {"retry_after": 2}})),
        )
        .mount(&server)
        .await;

    let model: ModelId = "openai:gpt-4o-mini".parse().unwrap();
    let client = create_backend(&model, &config_for(ProviderKind::OpenAi, &server), &no_retry()).unwrap();
    let registry = registry(vec![]);

    let err = ExecutionLoop::new(&client, &registry)
        .run_goal(None, "hi")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TetherError::RateLimited {
            retry_after_ms: Some(2000)
        }
    ));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_final("recovered")))
        .mount(&server)
        .await;

    let model: ModelId = "openai:gpt-4o-mini".parse().unwrap();
    let settings = LoopSettings {
        max_retries: 1,
        ..LoopSettings::default()
    };
    let client = create_backend(&model, &config_for(ProviderKind::OpenAi, &server), &settings).unwrap();
    let registry = registry(vec![]);

    let outcome = ExecutionLoop::new(&client, &registry)
        .run_goal(None, "hi")
        .await
        .unwrap();
    assert_eq!(outcome.text, "recovered");
}

#[tokio::test]
async fn protocol_violations_surface_as_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let model: ModelId = "openai:gpt-4o-mini".parse().unwrap();
    let client = create_backend(&model, &config_for(ProviderKind::OpenAi, &server), &no_retry()).unwrap();
    let registry = registry(vec![]);

    let err = ExecutionLoop::new(&client, &registry)
        .run_goal(None, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, TetherError::Protocol(_)));
}
