//! Chat-completions proxy for the assistant endpoint.
//!
//! The client is synchronous; handlers call it through
//! `tokio::task::spawn_blocking` so the request never blocks the
//! runtime. A mock implementation backs the router tests.

use serde::{Deserialize, Serialize};

use crate::models::enums::Role;

const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT_SECS: u64 = 30;

const SYSTEM_PROMPT: &str = "You are a helpful medical assistant for a hospital \
appointment and consultation platform. Answer questions about appointments, \
prescriptions, and general health topics clearly and concisely. Recommend \
consulting a doctor for anything requiring diagnosis or treatment. Never \
prescribe medication yourself.";

/// System prompt with the caller's identity appended, so replies can
/// address the user appropriately.
pub fn system_prompt(user_name: &str, role: Role) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nYou are talking to {user_name}, a {} on the platform.",
        role.as_str()
    )
}

/// Errors from the chat-completions call.
#[derive(Debug, thiserror::Error)]
pub enum ChatbotError {
    #[error("Chatbot service unreachable: {0}")]
    Connection(String),
    #[error("Chatbot request failed: {0}")]
    HttpClient(String),
    #[error("Chatbot service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Chatbot response had no choices")]
    EmptyResponse,
    #[error("Failed to parse chatbot response: {0}")]
    ResponseParsing(String),
}

/// A chat-completions backend. Object-safe so the API context can hold
/// either the real client or a test mock.
pub trait ChatbotClient: Send + Sync {
    fn complete(&self, system: &str, message: &str) -> Result<String, ChatbotError>;
}

/// Client for an OpenRouter-compatible chat-completions API.
pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OpenRouterClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, ChatbotError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChatbotError::HttpClient(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl ChatbotClient for OpenRouterClient {
    fn complete(&self, system: &str, message: &str) -> Result<String, ChatbotError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ChatbotError::Connection(self.base_url.clone())
                } else {
                    ChatbotError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ChatbotError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| ChatbotError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ChatbotError::EmptyResponse)
    }
}

/// Canned-reply client for tests. Records the prompts it was given.
#[cfg(test)]
pub struct MockChatbotClient {
    pub reply: String,
    pub fail: bool,
    pub calls: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockChatbotClient {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl ChatbotClient for MockChatbotClient {
    fn complete(&self, system: &str, message: &str) -> Result<String, ChatbotError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((system.to_string(), message.to_string()));
        }
        if self.fail {
            return Err(ChatbotError::Connection("mock".to_string()));
        }
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_the_caller() {
        let prompt = system_prompt("Dr. Rao", Role::Doctor);
        assert!(prompt.contains("Dr. Rao"));
        assert!(prompt.contains("a doctor"));
        assert!(prompt.starts_with(SYSTEM_PROMPT));
    }

    #[test]
    fn mock_records_calls() {
        let mock = MockChatbotClient::replying("hello");
        let reply = mock.complete("sys", "hi").unwrap();
        assert_eq!(reply, "hello");
        let calls = mock.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "hi");
    }

    #[test]
    fn failing_mock_returns_connection_error() {
        let mock = MockChatbotClient::failing();
        assert!(matches!(
            mock.complete("sys", "hi"),
            Err(ChatbotError::Connection(_))
        ));
    }

    #[test]
    fn response_parsing_extracts_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Take care."}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Take care.");
    }
}
