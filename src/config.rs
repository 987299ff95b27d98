//! Configuration module

use std::env;
use std::time::Duration;

use crate::llm::ProviderKind;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Classifier, scaler and attribution artifact locations
    pub artifacts: ArtifactConfig,

    /// Number of ranked factors reported per sign
    pub top_k: usize,

    pub llm: LlmConfig,

    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub model_path: String,
    pub scaler_path: String,
    pub explainer_path: String,
}

/// LLM provider settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Providers in the order they are tried
    pub provider_order: Vec<ProviderKind>,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
}

/// Credentials and endpoint for a single provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl ProviderConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Redis => "redis",
            CacheBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: String,
    pub ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            artifacts: ArtifactConfig {
                model_path: env::var("MODEL_PATH")
                    .unwrap_or_else(|_| "model/fraud_model.onnx".to_string()),
                scaler_path: env::var("SCALER_PATH")
                    .unwrap_or_else(|_| "model/scaler.json".to_string()),
                explainer_path: env::var("EXPLAINER_PATH")
                    .unwrap_or_else(|_| "model/shap_explainer.onnx".to_string()),
            },

            top_k: env::var("TOP_K")
                .ok()
                .and_then(|k| k.parse().ok())
                .unwrap_or(crate::explain::DEFAULT_TOP_K),

            llm: LlmConfig {
                provider_order: provider_order(
                    env::var("LLM_PROVIDERS").ok().as_deref(),
                    &env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string()),
                ),
                timeout: Duration::from_secs(
                    env::var("LLM_TIMEOUT_SECS")
                        .ok()
                        .and_then(|t| t.parse().ok())
                        .unwrap_or(30),
                ),
                temperature: env::var("LLM_TEMPERATURE")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(0.1),
                max_tokens: env::var("LLM_MAX_TOKENS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(350),
                openai: ProviderConfig {
                    api_key: env::var("OPENAI_API_KEY").ok(),
                    model: env::var("OPENAI_MODEL")
                        .unwrap_or_else(|_| crate::llm::openai::DEFAULT_MODEL.to_string()),
                    base_url: env::var("OPENAI_BASE_URL")
                        .unwrap_or_else(|_| crate::llm::openai::DEFAULT_BASE_URL.to_string()),
                },
                gemini: ProviderConfig {
                    api_key: env::var("GEMINI_API_KEY").ok(),
                    model: env::var("GEMINI_MODEL")
                        .unwrap_or_else(|_| crate::llm::gemini::DEFAULT_MODEL.to_string()),
                    base_url: env::var("GEMINI_BASE_URL")
                        .unwrap_or_else(|_| crate::llm::gemini::DEFAULT_BASE_URL.to_string()),
                },
            },

            cache: CacheConfig {
                enabled: env::var("REDIS_ENABLED")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
                backend: match env::var("CACHE_BACKEND").as_deref() {
                    Ok("memory") => CacheBackend::Memory,
                    _ => CacheBackend::Redis,
                },
                redis_url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),
                ttl: Duration::from_secs(
                    env::var("CACHE_TTL_SECS")
                        .ok()
                        .and_then(|t| t.parse().ok())
                        .unwrap_or(3600),
                ),
            },
        }
    }
}

/// Resolve the provider priority order.
///
/// An explicit `LLM_PROVIDERS` list wins. Otherwise the primary provider goes
/// first and every other known provider follows in its default position, so
/// the order is always total.
pub fn provider_order(explicit: Option<&str>, primary: &str) -> Vec<ProviderKind> {
    let mut order = Vec::new();

    let requested: Vec<&str> = match explicit {
        Some(list) if !list.trim().is_empty() => list.split(',').collect(),
        _ => std::iter::once(primary)
            .chain(ProviderKind::ALL.iter().map(|p| p.as_str()))
            .collect(),
    };

    for name in requested {
        match name.trim().parse::<ProviderKind>() {
            Ok(kind) if !order.contains(&kind) => order.push(kind),
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring LLM provider: {}", e),
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_goes_first_then_defaults() {
        assert_eq!(
            provider_order(None, "gemini"),
            vec![ProviderKind::Gemini, ProviderKind::OpenAi]
        );
        assert_eq!(
            provider_order(None, "openai"),
            vec![ProviderKind::OpenAi, ProviderKind::Gemini]
        );
    }

    #[test]
    fn explicit_list_is_used_verbatim() {
        assert_eq!(provider_order(Some("gemini"), "openai"), vec![ProviderKind::Gemini]);
        assert_eq!(
            provider_order(Some(" OpenAI , gemini,openai"), "gemini"),
            vec![ProviderKind::OpenAi, ProviderKind::Gemini]
        );
    }

    #[test]
    fn unknown_providers_are_dropped() {
        assert_eq!(
            provider_order(None, "llama"),
            vec![ProviderKind::OpenAi, ProviderKind::Gemini]
        );
        assert!(provider_order(Some("llama,claude"), "openai").is_empty());
    }

    #[test]
    fn provider_without_key_is_not_configured() {
        let cfg = ProviderConfig {
            api_key: Some("   ".to_string()),
            model: "m".to_string(),
            base_url: "http://localhost".to_string(),
        };
        assert!(!cfg.is_configured());
    }
}
