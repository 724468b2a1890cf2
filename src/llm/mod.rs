//! Reqwest-based client for OpenAI-compatible Chat Completions (Groq by default).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// Generated text of the first choice.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = cfg.require("GROQ_API_KEY")?;
        let api_base_url = cfg
            .get("API_BASE_URL")
            .unwrap_or_else(|| "https://api.groq.com/openai/v1".into());
        let trimmed = api_base_url.trim_end_matches('/');
        let base_url = if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
            format!("{}/v1", trimmed)
        } else {
            trimmed.to_string()
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout()))
            .build()
            .map_err(|e| Error::CompletionRequestFailed(e.to_string()))?;

        Ok(Self { http, base_url, api_key })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let hv = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| Error::CompletionRequestFailed(format!("invalid API key header: {e}")))?;
        headers.insert(AUTHORIZATION, hv);

        let mut body = serde_json::json!({
            "model": opts.model,
            "messages": messages,
        });
        if let Some(t) = opts.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(p) = opts.top_p {
            body["top_p"] = serde_json::json!(p);
        }

        tracing::debug!(%url, model = %opts.model, "sending chat completion request");
        let resp = self
            .http
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::CompletionRequestFailed(format!("failed to send chat request: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::CompletionRequestFailed(format!("LLM error: {} - {}", status, text)));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Error::CompletionRequestFailed(format!("malformed response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::CompletionRequestFailed("response has no message content".into()))?;
        tracing::debug!(chars = text.len(), "completion received");

        Ok(Completion { text, model: parsed.model.unwrap_or_else(|| opts.model.clone()) })
    }
}

// Minimal response structures for OpenAI-like completions
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg_for(uri: &str) -> Config {
        Config::from_pairs([("GROQ_API_KEY", "gsk-test"), ("API_BASE_URL", uri)])
    }

    #[test]
    fn base_url_gets_v1_suffix() {
        let client = LlmClient::from_config(&cfg_for("http://localhost:9999/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999/v1");
        let client = LlmClient::from_config(&cfg_for("https://api.groq.com/openai/v1")).unwrap();
        assert_eq!(client.base_url(), "https://api.groq.com/openai/v1");
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let cfg = Config::from_pairs([("API_BASE_URL", "http://localhost")]);
        assert!(matches!(
            LlmClient::from_config(&cfg),
            Err(Error::ConfigurationMissing { .. })
        ));
    }

    #[tokio::test]
    async fn chat_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(serde_json::json!({"model": "m1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "m1",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}
                ]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::from_config(&cfg_for(&server.uri())).unwrap();
        let opts = ChatOptions { model: "m1".into(), temperature: None, top_p: None };
        let out = client
            .chat(&[ChatMessage::new(Role::User, "hi")], &opts)
            .await
            .expect("chat");
        assert_eq!(out.text, "hello");
        assert_eq!(out.model, "m1");
    }

    #[tokio::test]
    async fn chat_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let client = LlmClient::from_config(&cfg_for(&server.uri())).unwrap();
        let opts = ChatOptions { model: "m1".into(), temperature: Some(0.0), top_p: None };
        let err = client.chat(&[], &opts).await.unwrap_err();
        match err {
            Error::CompletionRequestFailed(msg) => assert!(msg.contains("401")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
