use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// A hosted chat-completion model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;
}

/// Any endpoint speaking the OpenAI `/chat/completions` dialect (Groq, OpenAI, local gateways).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        client: Client,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client,
            timeout,
            temperature: 0.5,
            max_tokens: 2048,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("LLM_API_KEY is not set".to_string()));
        }

        let payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("LLM API error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;
        extract_content(&body)
            .ok_or_else(|| anyhow::anyhow!("Invalid chat completion response format").into())
    }
}

fn extract_content(body: &JsonValue) -> Option<String> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_choice_content() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}]
        });
        assert_eq!(extract_content(&body).as_deref(), Some("Hello"));
        assert_eq!(extract_content(&json!({"choices": []})), None);
    }

    #[tokio::test]
    async fn missing_api_key_fails_at_call_time() {
        let provider = OpenAiCompatibleProvider::new(
            String::new(),
            "https://api.groq.com/openai/v1/".into(),
            "llama-3.3-70b-versatile".into(),
            Client::new(),
            Duration::from_secs(1),
        );
        assert_eq!(
            provider.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        let err = provider
            .complete(vec![ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
