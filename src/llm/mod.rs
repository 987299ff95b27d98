//! LLM providers used to narrate a risk summary
//!
//! Each provider turns a prompt into text with exactly one HTTP call. The
//! explanation agent owns ordering and fallback; providers only report errors.

pub mod gemini;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::LlmConfig;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    /// Default position of every known provider
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Shared HTTP client for every provider
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Instantiate the configured providers in priority order.
///
/// Providers without an API key are skipped.
pub fn providers_from_config(
    config: &LlmConfig,
    client: reqwest::Client,
) -> Vec<Arc<dyn ExplanationProvider>> {
    let mut providers: Vec<Arc<dyn ExplanationProvider>> = Vec::new();

    for kind in &config.provider_order {
        let settings = match kind {
            ProviderKind::OpenAi => &config.openai,
            ProviderKind::Gemini => &config.gemini,
        };

        let Some(api_key) = settings.api_key.clone().filter(|_| settings.is_configured()) else {
            tracing::info!("LLM provider {} has no API key, skipping", kind);
            continue;
        };

        let provider: Arc<dyn ExplanationProvider> = match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                client.clone(),
                api_key,
                settings.model.clone(),
                settings.base_url.clone(),
                config.temperature,
                config.max_tokens,
            )),
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                client.clone(),
                api_key,
                settings.model.clone(),
                settings.base_url.clone(),
            )),
        };

        tracing::info!("LLM provider {} initialized (model {})", kind, settings.model);
        providers.push(provider);
    }

    providers
}

/// Shorten upstream error bodies before they reach the logs
pub(crate) fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
