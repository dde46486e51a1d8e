//! Shared test helpers: a scripted transport and tool fixtures.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use tether::error::TetherError;
use tether::provider::{BackendRequest, BackendResponse, ChatTransport};
use tether::tools::{FnTool, Tool, ToolParameters, ToolRegistry};

/// Transport that replays queued bodies and records every request it was handed.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse, TetherError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .map(BackendResponse::new)
            .ok_or_else(|| TetherError::protocol("script exhausted"))
    }
}

/// Transport whose requests never complete.
pub struct StalledTransport;

#[async_trait]
impl ChatTransport for StalledTransport {
    async fn send(&self, _request: &BackendRequest) -> Result<BackendResponse, TetherError> {
        std::future::pending().await
    }
}

/// Chat-completions body with a plain answer.
pub fn chat_final(text: &str) -> Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": text}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// Chat-completions body requesting `(id, name, arguments)` calls.
pub fn chat_tool_calls(calls: &[(&str, &str, Value)]) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": args.to_string()}
            })
        })
        .collect();
    json!({
        "choices": [{"message": {"role": "assistant", "content": null, "tool_calls": tool_calls}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// Ollama `/api/chat` body.
pub fn ollama_reply(text: &str) -> Value {
    json!({
        "message": {"role": "assistant", "content": text},
        "done": true,
        "prompt_eval_count": 12,
        "eval_count": 8
    })
}

/// `add(a, b)` over integers.
pub fn add_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "add",
        "Add two integers",
        ToolParameters::object()
            .integer("a", "First addend", true)
            .integer("b", "Second addend", true)
            .build(),
        |args, _ctx| async move {
            let sum = args.get_i64("a")? + args.get_i64("b")?;
            Ok(json!(sum))
        },
    ))
}

/// Tool that always fails with `message`.
pub fn failing_tool(name: &str, message: &'static str) -> Arc<dyn Tool> {
    let tool_name = name.to_string();
    Arc::new(FnTool::new(
        name,
        "Always fails",
        ToolParameters::empty(),
        move |_args, _ctx| {
            let tool_name = tool_name.clone();
            async move { Err(TetherError::tool(tool_name, message)) }
        },
    ))
}

/// Tool that echoes its `text` argument.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "echo",
        "Echo the input text",
        ToolParameters::object()
            .string("text", "Text to echo", true)
            .build(),
        |args, _ctx| async move { Ok(json!(args.get_str("text")?)) },
    ))
}

pub fn registry(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
    ToolRegistry::new(tools).unwrap()
}

/// Messages array of a recorded request body.
pub fn messages_of(request: &BackendRequest) -> Vec<Value> {
    request.body["messages"].as_array().cloned().unwrap_or_default()
}
