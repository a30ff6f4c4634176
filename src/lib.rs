//! colloquy — conversation orchestration engine for tool-using chat agents.
//!
//! Operators define named agents (a system prompt plus a set of callable
//! tools) and converse with them. The engine turns each inbound message
//! into a bounded tool-calling session, reconciles the session transcript
//! against persisted history without losing or duplicating turns, tracks
//! token/cost accounting per call, and produces a durable, queryable chat
//! log.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use colloquy::client::OpenAiClient;
//! use colloquy::config::EngineConfig;
//! use colloquy::engine::ChatEngine;
//! use colloquy::store::{AgentStore, MemoryAgentStore, MemoryLogSink};
//! use colloquy::tools::{builtin::calculator_tool, ToolRegistry};
//! use colloquy::types::AgentRecord;
//!
//! # async fn example() -> colloquy::error::Result<()> {
//! let registry = Arc::new(ToolRegistry::new());
//! registry.register(calculator_tool()).await?;
//!
//! let store = Arc::new(MemoryAgentStore::new());
//! let agent = store
//!     .put(AgentRecord::new("atlas", "math helper", "You are Atlas.")
//!         .with_tools(["calculator"]))
//!     .await?;
//!
//! let engine = ChatEngine::new(
//!     EngineConfig::from_env(),
//!     store,
//!     registry,
//!     Arc::new(OpenAiClient::from_env("gpt-4o-mini")?),
//!     Arc::new(MemoryLogSink::new()),
//! );
//! let outcome = engine
//!     .process_chat_message(agent.id, "What is 2 + 3?", None)
//!     .await?;
//! println!("{}", outcome.response);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod store;
pub mod tools;
pub mod types;
