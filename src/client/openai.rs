//! OpenAI-compatible Chat Completions client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::SessionSettings;
use crate::error::{ColloquyError, Result};
use crate::types::{ChatTurn, ModelPricing, TurnRole, Usage};

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{Completion, LlmClient, ToolCallRequest, ToolSpec};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for any OpenAI-compatible Chat Completions endpoint.
pub struct OpenAiClient {
    model: String,
    api_key: String,
    base_url: String,
    settings: SessionSettings,
    pricing: Option<ModelPricing>,
}

impl OpenAiClient {
    pub fn new(model: impl Into<String>, api_key: String, base_url: Option<String>) -> Self {
        let model = model.into();
        let pricing = pricing_for(&model);
        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            settings: SessionSettings::default(),
            pricing,
        }
    }

    /// Build a client from `OPENAI_API_KEY` / `OPENAI_BASE_URL`.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ColloquyError::Configuration("Missing OPENAI_API_KEY".into()))?;
        let base_url = std::env::var("OPENAI_BASE_URL").ok();
        Ok(Self::new(model, api_key, base_url))
    }

    /// Forward generation settings (temperature, max_tokens) on every call.
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    fn build_request_body(&self, messages: &[ChatTurn], tools: &[ToolSpec]) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = messages.iter().map(turn_to_openai).collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        let obj = body.as_object_mut().unwrap();

        if let Some(max) = self.settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = self.settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if !tools.is_empty() {
            let tool_defs: Vec<serde_json::Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            obj.insert("tools".into(), tool_defs.into());
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatTurn], tools: &[ToolSpec]) -> Result<Completion> {
        let body = self.build_request_body(messages, tools);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, turns = messages.len(), "chat completion request");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: ChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ColloquyError::Upstream("no choices in completion response".into()))?;

        let tool_call = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|tc| ToolCallRequest {
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments)),
            });

        let usage = data.usage.map(|u| {
            let cost = self
                .pricing
                .map(|p| p.cost_of(u.prompt_tokens, u.completion_tokens))
                .unwrap_or(0.0);
            Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
                cost,
            }
        });

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_call,
            usage,
        })
    }
}

/// Map a transcript turn to an OpenAI chat message.
///
/// Tool results travel as user turns so the transcript stays valid without
/// tracking provider tool-call ids.
fn turn_to_openai(turn: &ChatTurn) -> serde_json::Value {
    match turn.role {
        TurnRole::System => serde_json::json!({"role": "system", "content": turn.content}),
        TurnRole::User => serde_json::json!({"role": "user", "content": turn.content}),
        TurnRole::Assistant => serde_json::json!({"role": "assistant", "content": turn.content}),
        TurnRole::Tool => {
            let name = turn.tool_name.as_deref().unwrap_or("tool");
            serde_json::json!({
                "role": "user",
                "content": format!("Tool {} result: {}", name, turn.content),
            })
        }
    }
}

/// Per-million-token pricing for known models; unknown models cost zero.
fn pricing_for(model: &str) -> Option<ModelPricing> {
    let pricing = match model {
        "gpt-4o" => ModelPricing {
            input_per_million: 2.5,
            output_per_million: 10.0,
        },
        "gpt-4o-mini" => ModelPricing {
            input_per_million: 0.15,
            output_per_million: 0.6,
        },
        "gpt-4-turbo" | "gpt-4-turbo-preview" => ModelPricing {
            input_per_million: 10.0,
            output_per_million: 30.0,
        },
        _ => return None,
    };
    Some(pricing)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_turns_become_user_messages() {
        let turn = ChatTurn::tool("calculator", "5");
        let msg = turn_to_openai(&turn);
        assert_eq!(msg["role"], "user");
        assert_eq!(msg["content"], "Tool calculator result: 5");
    }

    #[test]
    fn request_body_includes_tools_and_settings() {
        let client = OpenAiClient::new("gpt-4o-mini", "sk-test".into(), None).with_settings(
            SessionSettings::builder().temperature(0.7).max_tokens(256).build(),
        );
        let specs = [ToolSpec {
            name: "calculator".into(),
            description: "math".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let body = client.build_request_body(&[ChatTurn::user("hi")], &specs);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["tools"][0]["function"]["name"], "calculator");
    }

    #[test]
    fn unknown_model_has_no_pricing() {
        assert!(pricing_for("mystery-model").is_none());
        assert!(pricing_for("gpt-4o").is_some());
    }
}
