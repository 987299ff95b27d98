//! Explanation agent
//!
//! Looks up a cached narrative by input fingerprint, otherwise asks each
//! provider in priority order and falls back to a fixed narrative. Whatever
//! is returned gets cached.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::llm::ExplanationProvider;

use super::fingerprint::fingerprint;
use super::prompt::build_prompt;
use super::ExplainInputs;

pub const FALLBACK_NARRATIVE: &str = "LLM unavailable. Basic explanation:\n\
The model detected unusual patterns and requires manual review.\n\
Customer-friendly: 'We need to verify a recent transaction for safety.'";

pub struct ExplanationAgent {
    providers: Vec<Arc<dyn ExplanationProvider>>,
    cache: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
}

impl ExplanationAgent {
    pub fn new(
        providers: Vec<Arc<dyn ExplanationProvider>>,
        cache: Option<Arc<dyn CacheStore>>,
        ttl: Duration,
    ) -> Self {
        Self { providers, cache, ttl }
    }

    /// Provider names in the order they are tried
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn cache_backend(&self) -> Option<&'static str> {
        self.cache.as_ref().map(|c| c.backend())
    }

    pub async fn explain(&self, inputs: &ExplainInputs) -> String {
        let key = fingerprint(inputs);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key).await {
                tracing::debug!("Explanation cache hit for {}", key);
                return cached;
            }
        }

        let prompt = build_prompt(inputs);
        let narrative = self.generate(&prompt).await;

        if let Some(cache) = &self.cache {
            if !cache.set(&key, &narrative, self.ttl).await {
                tracing::debug!("Explanation not cached for {}", key);
            }
        }

        narrative
    }

    async fn generate(&self, prompt: &str) -> String {
        for provider in &self.providers {
            match provider.generate(prompt).await {
                Ok(text) => {
                    tracing::debug!("Explanation generated by {}", provider.name());
                    return text;
                }
                Err(e) => {
                    tracing::warn!("LLM provider {} failed: {}", provider.name(), e);
                }
            }
        }

        if self.providers.is_empty() {
            tracing::debug!("No LLM provider configured, using fallback explanation");
        } else {
            tracing::warn!("All LLM providers failed, using fallback explanation");
        }
        FALLBACK_NARRATIVE.to_string()
    }
}
