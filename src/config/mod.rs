//! Engine configuration (code > environment > `.env`).

use std::time::Duration;

use bon::Builder;

use crate::engine::memory::MemoryPolicy;

/// Default hard cap on tool-calling iterations per session.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Default wall-clock timeout around each LLM call.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Generation settings forwarded to the LLM client on every call.
#[derive(Debug, Clone, Builder, Default, PartialEq)]
pub struct SessionSettings {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Configuration for a [`ChatEngine`](crate::engine::ChatEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model name recorded in chat logs and offered to the LLM client.
    pub model: String,
    pub settings: SessionSettings,
    /// Hard cap on (LLM call, tool invocation) iterations per session.
    pub max_iterations: usize,
    /// Wall-clock timeout around each LLM call.
    pub llm_timeout: Duration,
    pub memory: MemoryPolicy,
    /// Requestor recorded when the caller does not supply one.
    pub default_requestor: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            settings: SessionSettings::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            memory: MemoryPolicy::default(),
            default_requestor: "administrator".to_string(),
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment, loading `.env` first.
    ///
    /// Recognized variables: `COLLOQUY_MODEL`, `COLLOQUY_TEMPERATURE`,
    /// `COLLOQUY_MAX_TOKENS`, `COLLOQUY_MAX_ITERATIONS`,
    /// `COLLOQUY_LLM_TIMEOUT_SECS`. Unset or malformed values fall back to
    /// defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(model) = std::env::var("COLLOQUY_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        config.settings.temperature = env_parse("COLLOQUY_TEMPERATURE");
        config.settings.max_tokens = env_parse("COLLOQUY_MAX_TOKENS");
        if let Some(iterations) = env_parse("COLLOQUY_MAX_ITERATIONS") {
            config.max_iterations = iterations;
        }
        if let Some(secs) = env_parse::<u64>("COLLOQUY_LLM_TIMEOUT_SECS") {
            config.llm_timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_memory(mut self, memory: MemoryPolicy) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.llm_timeout, Duration::from_secs(120));
        assert_eq!(config.memory.shrink_threshold, 50);
        assert_eq!(config.memory.max_turns, 100);
        assert_eq!(config.default_requestor, "administrator");
    }

    #[test]
    fn builder_style_overrides() {
        let config = EngineConfig::default()
            .with_model("gpt-4o")
            .with_max_iterations(3)
            .with_llm_timeout(Duration::from_secs(10));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.llm_timeout, Duration::from_secs(10));
    }

    #[test]
    fn settings_builder() {
        let settings = SessionSettings::builder()
            .temperature(0.7)
            .max_tokens(4000)
            .build();
        assert_eq!(settings.temperature, Some(0.7));
        assert_eq!(settings.max_tokens, Some(4000));
    }
}
