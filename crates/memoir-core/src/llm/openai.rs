//! OpenAI-compatible chat-completions client.

use crate::core_types::{LLMResponse, Message};
use crate::errors::MemoirError;
use crate::llm::response_parser::extract_completion_text;
use crate::llm::LLM;
use crate::settings::MemoirSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Model id substrings considered chat-capable when filtering `/models`.
const CHAT_MODEL_HINTS: [&str; 8] = [
    "gpt", "claude", "chat", "turbo", "deepseek", "gemini", "mistral", "llama",
];

#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: Option<f32>,
}

impl CompletionClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: "https://api.openai.com/v1".to_string(),
            model,
            temperature: None,
        }
    }

    /// Builds a client from the persisted settings blob.
    pub fn from_settings(settings: &MemoirSettings) -> Self {
        Self::new(settings.api_key.clone(), settings.model.clone())
            .with_api_base(settings.api_url.clone())
            .with_temperature(0.7)
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn build_request_body(&self, messages: &[Message]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = temperature.into();
        }
        body
    }

    /// Lists models from `GET {api_base}/models`, preferring chat-capable ids.
    /// Accepts both `data` and `models` arrays, and entries that are either
    /// objects (`id`/`model`/`name`) or plain strings. When the chat filter
    /// matches nothing, every model is returned instead.
    pub async fn list_models(&self) -> Result<Vec<String>, MemoirError> {
        let url = format!("{}/models", self.api_base);
        log::info!("Fetching model list from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MemoirError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = serde_json::from_str(&body)?;
        let entries = parsed["data"]
            .as_array()
            .or_else(|| parsed["models"].as_array())
            .cloned()
            .unwrap_or_default();

        let all: Vec<String> = entries
            .iter()
            .filter_map(|entry| {
                entry["id"]
                    .as_str()
                    .or_else(|| entry["model"].as_str())
                    .or_else(|| entry["name"].as_str())
                    .or_else(|| entry.as_str())
                    .map(|s| s.to_string())
            })
            .collect();

        let chat_models: Vec<String> = all
            .iter()
            .filter(|id| {
                let lower = id.to_lowercase();
                CHAT_MODEL_HINTS.iter().any(|hint| lower.contains(hint))
            })
            .cloned()
            .collect();

        let models = if chat_models.is_empty() { all } else { chat_models };
        log::info!("Model list fetched: {} usable models", models.len());
        Ok(models)
    }
}

#[async_trait]
impl LLM for CompletionClient {
    async fn generate(&self, messages: Vec<Message>) -> Result<LLMResponse, MemoirError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(&messages);

        log::debug!("Completion request to {} with model {}", url, self.model);
        log::debug!(
            "Request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        log::debug!("Completion response ({}): {}", status, response_text);

        if !status.is_success() {
            return Err(MemoirError::Transport {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|e| MemoirError::Parsing(format!("Invalid JSON response: {}", e)))?;

        let content = extract_completion_text(&response_json);
        if content.is_none() {
            // full body kept in the log for diagnosis
            log::error!(
                "No completion text found in response: {}",
                serde_json::to_string_pretty(&response_json).unwrap_or(response_text)
            );
        }

        Ok(LLMResponse { content })
    }
}
