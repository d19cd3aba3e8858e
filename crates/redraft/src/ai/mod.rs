//! Generative text services.
//!
//! The pipeline only sees [`GenerativeService`]; [`ServiceFactory`] turns a
//! resolved [`ServiceBinding`] into a live service once per run.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::model::{Stage, Turn};

pub mod openai;
pub mod prompts;

pub use openai::{OpenAiService, OpenAiServiceFactory};
pub use prompts::{DefaultPrompts, PromptProvider};

/// Errors raised by a generative service call.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("No API key configured for model '{model}'")]
    MissingApiKey { model: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Service returned an empty completion")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

/// Model and credentials a service is bound to.
#[derive(Debug)]
pub struct ServiceBinding {
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
}

#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Rewrites `input` for `stage`, with prior outputs as context.
    async fn rewrite(
        &self,
        stage: Stage,
        input: &str,
        prompt: &str,
        history: &[Turn],
    ) -> Result<String, AiError>;

    /// Summarizes `turns` following `instruction`.
    async fn compress(&self, turns: &[Turn], instruction: &str) -> Result<String, AiError>;
}

pub trait ServiceFactory: Send + Sync {
    fn build(&self, binding: ServiceBinding) -> Arc<dyn GenerativeService>;
}
