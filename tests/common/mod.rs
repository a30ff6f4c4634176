//! Shared fixtures: a scripted LLM client and engine assembly helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use colloquy::client::{Completion, LlmClient, ToolCallRequest, ToolSpec};
use colloquy::config::EngineConfig;
use colloquy::engine::ChatEngine;
use colloquy::error::ColloquyError;
use colloquy::store::{MemoryAgentStore, MemoryLogSink};
use colloquy::tools::builtin::{calculator_tool, echo_tool};
use colloquy::tools::ToolRegistry;
use colloquy::types::{ChatTurn, Usage};

/// One scripted round-trip.
#[derive(Clone)]
pub enum ScriptedResponse {
    Reply(Completion),
    Fail(String),
}

/// LLM client that replays a fixed script.
///
/// Steps are consumed in order; the last step repeats forever, so a script
/// ending in a tool call produces an endless tool loop.
pub struct ScriptedClient {
    model: String,
    script: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(steps: Vec<ScriptedResponse>) -> Arc<Self> {
        Arc::new(Self {
            model: "mock-model".to_string(),
            script: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        _messages: &[ChatTurn],
        _tools: &[ToolSpec],
    ) -> colloquy::error::Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let step = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or(ScriptedResponse::Reply(Completion::default()))
        };
        match step {
            ScriptedResponse::Reply(completion) => Ok(completion),
            ScriptedResponse::Fail(message) => Err(ColloquyError::Upstream(message)),
        }
    }
}

pub fn usage(input: u32, output: u32, cost: f64) -> Usage {
    Usage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
        cost,
    }
}

pub fn reply(text: &str, usage: Option<Usage>) -> ScriptedResponse {
    ScriptedResponse::Reply(Completion {
        content: text.to_string(),
        tool_call: None,
        usage,
    })
}

pub fn tool_call(name: &str, args: serde_json::Value, usage: Option<Usage>) -> ScriptedResponse {
    ScriptedResponse::Reply(Completion {
        content: String::new(),
        tool_call: Some(ToolCallRequest {
            name: name.to_string(),
            arguments: args,
        }),
        usage,
    })
}

pub fn fail(message: &str) -> ScriptedResponse {
    ScriptedResponse::Fail(message.to_string())
}

/// Everything an engine test needs in one bundle.
pub struct Harness {
    pub engine: ChatEngine,
    pub store: Arc<MemoryAgentStore>,
    pub sink: Arc<MemoryLogSink>,
    pub registry: Arc<ToolRegistry>,
}

/// Assemble an engine over in-memory stores with the built-in tools
/// registered.
pub async fn harness(llm: Arc<ScriptedClient>, config: EngineConfig) -> Harness {
    let store = Arc::new(MemoryAgentStore::new());
    let sink = Arc::new(MemoryLogSink::new());
    let registry = Arc::new(ToolRegistry::new());
    registry.register(calculator_tool()).await.unwrap();
    registry.register(echo_tool()).await.unwrap();

    let engine = ChatEngine::new(config, store.clone(), registry.clone(), llm, sink.clone());
    Harness {
        engine,
        store,
        sink,
        registry,
    }
}
