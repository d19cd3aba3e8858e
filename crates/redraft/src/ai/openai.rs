//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint exposing `POST {base_url}/chat/completions`.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{AiError, GenerativeService, ServiceBinding, ServiceFactory};
use crate::model::{Role, Stage, Turn};

/// Default API base when a binding has none.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiService {
    binding: ServiceBinding,
    client: reqwest::Client,
}

impl OpenAiService {
    pub fn new(binding: ServiceBinding, client: reqwest::Client) -> Self {
        Self { binding, client }
    }

    fn endpoint(&self) -> String {
        let base = self
            .binding
            .base_url
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(OPENAI_API_BASE);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn build_request_body(&self, messages: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({
            "model": self.binding.model,
            "messages": messages,
        })
    }

    async fn complete(&self, messages: Vec<serde_json::Value>) -> Result<String, AiError> {
        let api_key = self
            .binding
            .api_key
            .as_ref()
            .ok_or_else(|| AiError::MissingApiKey {
                model: self.binding.model.clone(),
            })?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .json(&self.build_request_body(messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        extract_content(parsed)
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn message(role: Role, content: &str) -> serde_json::Value {
    serde_json::json!({ "role": role_name(role), "content": content })
}

/// System prompt, then prior turns, then the segment to rewrite.
fn rewrite_messages(prompt: &str, history: &[Turn], input: &str) -> Vec<serde_json::Value> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(message(Role::System, prompt));
    messages.extend(history.iter().map(|t| message(t.role, &t.content)));
    messages.push(message(Role::User, input));
    messages
}

fn compress_messages(instruction: &str, turns: &[Turn]) -> Vec<serde_json::Value> {
    let joined = turns
        .iter()
        .map(|t| t.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    vec![
        message(Role::System, instruction),
        message(Role::User, &joined),
    ]
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_content(response: ChatResponse) -> Result<String, AiError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(AiError::EmptyResponse)
}

#[async_trait]
impl GenerativeService for OpenAiService {
    async fn rewrite(
        &self,
        stage: Stage,
        input: &str,
        prompt: &str,
        history: &[Turn],
    ) -> Result<String, AiError> {
        log::debug!(
            "Requesting {} rewrite from {} ({} history turns)",
            stage,
            self.binding.model,
            history.len()
        );
        self.complete(rewrite_messages(prompt, history, input)).await
    }

    async fn compress(&self, turns: &[Turn], instruction: &str) -> Result<String, AiError> {
        log::debug!(
            "Requesting history compression from {} ({} turns)",
            self.binding.model,
            turns.len()
        );
        self.complete(compress_messages(instruction, turns)).await
    }
}

/// Builds [`OpenAiService`]s sharing one connection pool.
#[derive(Clone, Default)]
pub struct OpenAiServiceFactory {
    client: reqwest::Client,
}

impl OpenAiServiceFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ServiceFactory for OpenAiServiceFactory {
    fn build(&self, binding: ServiceBinding) -> Arc<dyn GenerativeService> {
        Arc::new(OpenAiService::new(binding, self.client.clone()))
    }
}
