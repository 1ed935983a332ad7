use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::types::ChatMessage;

/// The external decision service. Everything the pipeline asks it -- action
/// plans, job descriptions, match judgments, submission checks -- goes through
/// this one seam, so every consumer can run against a canned fake in tests.
#[allow(async_fn_in_trait)]
pub trait Oracle {
    /// Send a conversation, get back the single free-form reply text.
    /// Callers must never assume the reply is strict JSON.
    async fn chat(&self, messages: &[ChatMessage], timeout: Option<Duration>) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completions endpoint (x.ai by default).
pub struct GrokClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GrokClient {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("XAI_API_KEY")
            .map_err(|_| anyhow!("XAI_API_KEY not set in environment"))?;
        let base_url =
            std::env::var("XAI_BASE_URL").unwrap_or_else(|_| "https://api.x.ai/v1".to_string());
        let model =
            std::env::var("JOB_APPLIER_MODEL").unwrap_or_else(|_| "grok-beta".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        })
    }
}

impl Oracle for GrokClient {
    async fn chat(&self, messages: &[ChatMessage], timeout: Option<Duration>) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": 0.2,
            }));
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("unknown API error");
            return Err(anyhow!("oracle API error ({status}): {message}"));
        }

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("no content in oracle response: {body}"))?;

        debug!(reply = content, "oracle replied");
        Ok(content.trim().to_string())
    }
}
