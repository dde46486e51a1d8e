//! Mode selection and unified reports.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tether::agent_loop::{LoopEvent, LoopEventPayload, LoopEventSink, RunStatus};
use tether::config::LoopSettings;
use tether::error::TetherError;
use tether::orchestrator::{Orchestrator, RunMode};
use tether::provider::ollama::OllamaAdapter;
use tether::provider::openai::OpenAiAdapter;
use tether::provider::BackendClient;
use tokio_util::sync::CancellationToken;

#[test]
fn mode_follows_adapter_capability() {
    let registry = registry(vec![add_tool()]);
    let openai = BackendClient::new(OpenAiAdapter::new("gpt-4o-mini"), ScriptedTransport::new(Vec::new()));
    let ollama = BackendClient::new(OllamaAdapter::new("llama3.1"), ScriptedTransport::new(Vec::new()));

    assert_eq!(Orchestrator::new(&openai, &registry).mode(), RunMode::ToolLoop);
    assert_eq!(
        Orchestrator::new(&openai, &registry).force_planning(true).mode(),
        RunMode::Planning
    );
    assert_eq!(Orchestrator::new(&ollama, &registry).mode(), RunMode::Planning);
}

#[tokio::test]
async fn tool_loop_report_collects_calls_and_budget_status() {
    let transport = ScriptedTransport::new([
        chat_tool_calls(&[("c1", "add", json!({"a": 1, "b": 2}))]),
        chat_tool_calls(&[("c2", "add", json!({"a": 3, "b": 4}))]),
    ]);
    let client = BackendClient::new(OpenAiAdapter::new("gpt-4o-mini"), transport.clone());
    let registry = registry(vec![add_tool()]);
    let settings = LoopSettings {
        max_turns: 2,
        ..LoopSettings::default()
    };

    let report = Orchestrator::new(&client, &registry)
        .settings(settings)
        .system("You can add.")
        .run("keep adding")
        .await
        .unwrap();

    assert_eq!(report.mode, RunMode::ToolLoop);
    assert_eq!(report.status, RunStatus::BudgetExhausted);
    assert_eq!(report.executed_calls.len(), 2);
    assert_eq!(report.executed_calls[1].payload(), "7");
    assert_eq!(report.usage.total_tokens, 30);
    assert!(report.strategy.is_none());
    assert_eq!(
        messages_of(&transport.requests()[0])[0],
        json!({"role": "system", "content": "You can add."})
    );
}

#[tokio::test]
async fn drafted_strategy_becomes_the_execution_goal() {
    let transport = ScriptedTransport::new([
        chat_final("1. Call add with 2 and 3.\n2. Report the sum."),
        chat_final("5"),
    ]);
    let client = BackendClient::new(OpenAiAdapter::new("gpt-4o-mini"), transport.clone());
    let registry = registry(vec![add_tool()]);

    let report = Orchestrator::new(&client, &registry)
        .draft_strategy(true)
        .run("What is 2 + 3?")
        .await
        .unwrap();

    assert_eq!(
        report.strategy.as_deref(),
        Some("1. Call add with 2 and 3.\n2. Report the sum.")
    );
    let requests = transport.requests();
    assert!(requests[0].body.get("tools").is_none());
    assert_eq!(requests[0].body["temperature"], 0.6);
    let loop_messages = messages_of(&requests[1]);
    assert_eq!(
        loop_messages.last().unwrap()["content"],
        "1. Call add with 2 and 3.\n2. Report the sum."
    );
    assert_eq!(report.text, "5");
}

#[tokio::test]
async fn forced_planning_uses_plain_chat_calls() {
    let transport = ScriptedTransport::new([
        chat_final(r#"[{"tool_name": "add", "args": {"a": 2, "b": 2}}]"#),
        chat_final("Four."),
    ]);
    let client = BackendClient::new(OpenAiAdapter::new("gpt-4o-mini"), transport.clone());
    let registry = registry(vec![add_tool()]);

    let report = Orchestrator::new(&client, &registry)
        .force_planning(true)
        .run("2 + 2?")
        .await
        .unwrap();

    assert_eq!(report.mode, RunMode::Planning);
    assert_eq!(report.text, "Four.");
    assert_eq!(report.executed_calls[0].payload(), "4");
    assert!(transport
        .requests()
        .iter()
        .all(|request| request.body.get("tools").is_none()));
}

fn cancel_after(token: &CancellationToken, millis: u64) {
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        trigger.cancel();
    });
}

#[tokio::test]
async fn forced_planning_uses_the_system_prompt_for_synthesis() {
    let transport = ScriptedTransport::new([chat_final("[]"), chat_final("Nothing to do.")]);
    let client = BackendClient::new(OpenAiAdapter::new("gpt-4o-mini"), transport.clone());
    let registry = registry(vec![add_tool()]);

    let report = Orchestrator::new(&client, &registry)
        .force_planning(true)
        .system("Answer in French.")
        .run("Say hi")
        .await
        .unwrap();

    assert_eq!(report.text, "Nothing to do.");
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        messages_of(&requests[1])[0],
        json!({"role": "system", "content": "Answer in French."})
    );
    // The planner keeps its own instructions.
    assert_ne!(messages_of(&requests[0])[0]["content"], "Answer in French.");
}

#[tokio::test]
async fn planning_runs_can_be_canceled() {
    let client = BackendClient::new(OllamaAdapter::new("llama3.1"), Arc::new(StalledTransport));
    let registry = registry(vec![]);
    let token = CancellationToken::new();
    let events = Arc::new(Mutex::new(Vec::<LoopEvent>::new()));
    let captured = Arc::clone(&events);
    let sink: LoopEventSink = Arc::new(move |event| captured.lock().unwrap().push(event));
    cancel_after(&token, 20);

    let err = Orchestrator::new(&client, &registry)
        .cancel_token(token)
        .event_sink(sink)
        .run("hang")
        .await
        .unwrap_err();

    assert!(matches!(err, TetherError::Canceled));
    assert_eq!(
        events.lock().unwrap().last().map(|e| e.payload.clone()),
        Some(LoopEventPayload::Finished {
            status: RunStatus::Canceled
        })
    );
}

#[tokio::test]
async fn strategy_drafting_can_be_canceled() {
    let client = BackendClient::new(OpenAiAdapter::new("gpt-4o-mini"), Arc::new(StalledTransport));
    let registry = registry(vec![add_tool()]);
    let token = CancellationToken::new();
    cancel_after(&token, 20);

    let run = Orchestrator::new(&client, &registry)
        .draft_strategy(true)
        .cancel_token(token);
    let result = tokio::time::timeout(Duration::from_secs(2), run.run("hang"))
        .await
        .expect("cancellation should end the run");

    assert!(matches!(result, Err(TetherError::Canceled)));
}
