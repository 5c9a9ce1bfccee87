//! Reasoning capability providers.
//!
//! The pipeline talks to an abstract completion capability:
//! `complete(system_prompt, prompt) -> text`. Two interchangeable
//! backends exist, a local Ollama instance and hosted Gemini, and the
//! connection mode decides which to use. Instead of hand-written
//! fallback call sites, a [`ProviderChain`] holds an ordered list of
//! providers with per-call timeouts and tries them in order; this
//! generalizes if more backends are added.

pub mod gemini;
pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

/// Which backend(s) to use for reasoning calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Local Ollama only
    Local,
    /// Hosted Gemini only
    Cloud,
    /// Try local first with a short timeout, fall back to hosted
    Hybrid,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Local => "local",
            ConnectionMode::Cloud => "cloud",
            ConnectionMode::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> ConnectionMode {
        match s {
            "local" => ConnectionMode::Local,
            "cloud" => ConnectionMode::Cloud,
            _ => ConnectionMode::Hybrid,
        }
    }
}

impl Default for ConnectionMode {
    fn default() -> Self {
        ConnectionMode::Hybrid
    }
}

/// Connection settings for the two backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub mode: ConnectionMode,
    /// Base URL of the Ollama server, e.g. `http://127.0.0.1:11434`
    pub ollama_base_url: String,
    pub ollama_model: String,
    /// Base URL of the Gemini API
    pub gemini_base_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            mode: ConnectionMode::Hybrid,
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
        }
    }
}

/// The kind of pipeline call, which decides the timeout budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Category inference: cheap, short deadline
    Classify,
    /// Four-perspective review: larger prompt, more headroom
    Review,
}

impl CallKind {
    /// Timeout for an opportunistic local-first attempt in hybrid mode.
    fn hybrid_local_timeout(&self) -> Duration {
        match self {
            CallKind::Classify => Duration::from_secs(3),
            CallKind::Review => Duration::from_secs(5),
        }
    }

    /// Timeout when the local backend is the sole backend.
    fn local_timeout(&self) -> Duration {
        match self {
            CallKind::Classify => Duration::from_secs(5),
            CallKind::Review => Duration::from_secs(10),
        }
    }

    /// Timeout for the hosted backend.
    fn cloud_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// A completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Backend identifier (e.g. "ollama", "gemini").
    fn name(&self) -> &str;

    /// Send a prompt and return the raw response text.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, ProviderError>;
}

struct ChainEntry {
    provider: Box<dyn CompletionProvider>,
    timeout: Duration,
}

/// An ordered list of providers tried until one succeeds.
pub struct ProviderChain {
    entries: Vec<ChainEntry>,
}

impl ProviderChain {
    /// Build the chain for a call kind from the connection settings.
    pub fn for_call(config: &ProviderConfig, kind: CallKind) -> ProviderChain {
        let ollama = || {
            Box::new(OllamaProvider::new(
                &config.ollama_base_url,
                &config.ollama_model,
            )) as Box<dyn CompletionProvider>
        };
        let gemini = || {
            Box::new(GeminiProvider::new(
                &config.gemini_base_url,
                &config.gemini_api_key,
                &config.gemini_model,
            )) as Box<dyn CompletionProvider>
        };

        let entries = match config.mode {
            ConnectionMode::Local => vec![ChainEntry {
                provider: ollama(),
                timeout: kind.local_timeout(),
            }],
            ConnectionMode::Cloud => vec![ChainEntry {
                provider: gemini(),
                timeout: kind.cloud_timeout(),
            }],
            ConnectionMode::Hybrid => vec![
                ChainEntry {
                    provider: ollama(),
                    timeout: kind.hybrid_local_timeout(),
                },
                ChainEntry {
                    provider: gemini(),
                    timeout: kind.cloud_timeout(),
                },
            ],
        };
        ProviderChain { entries }
    }

    /// Build a chain from explicit providers (for tests).
    pub fn from_providers(providers: Vec<(Box<dyn CompletionProvider>, Duration)>) -> Self {
        ProviderChain {
            entries: providers
                .into_iter()
                .map(|(provider, timeout)| ChainEntry { provider, timeout })
                .collect(),
        }
    }

    /// Try each provider in order; the first success wins.
    ///
    /// A per-entry deadline applies; a timeout counts as that provider
    /// failing and the next one is tried. When every provider fails the
    /// last error is reported.
    pub async fn complete(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let mut last_error: Option<ProviderError> = None;
        for entry in &self.entries {
            let result =
                tokio::time::timeout(entry.timeout, entry.provider.complete(system_prompt, prompt))
                    .await;
            match result {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => {
                    tracing::debug!(provider = entry.provider.name(), error = %e, "provider failed");
                    last_error = Some(e);
                }
                Err(_) => {
                    let e = ProviderError::Timeout {
                        provider: entry.provider.name().to_string(),
                        timeout_ms: entry.timeout.as_millis() as u64,
                    };
                    tracing::debug!(provider = entry.provider.name(), error = %e, "provider timed out");
                    last_error = Some(e);
                }
            }
        }
        Err(ProviderError::AllFailed {
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no providers configured".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        name: &'static str,
        response: Result<String, ()>,
    }

    #[async_trait]
    impl CompletionProvider for FixedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(ProviderError::RequestFailed {
                    provider: self.name.to_string(),
                    message: "refused".to_string(),
                }),
            }
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl CompletionProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn first_success_wins() {
        let chain = ProviderChain::from_providers(vec![
            (
                Box::new(FixedProvider {
                    name: "a",
                    response: Ok("from a".to_string()),
                }),
                Duration::from_secs(1),
            ),
            (
                Box::new(FixedProvider {
                    name: "b",
                    response: Ok("from b".to_string()),
                }),
                Duration::from_secs(1),
            ),
        ]);
        assert_eq!(chain.complete("s", "p").await.unwrap(), "from a");
    }

    #[tokio::test]
    async fn falls_through_to_next_on_failure() {
        let chain = ProviderChain::from_providers(vec![
            (
                Box::new(FixedProvider {
                    name: "a",
                    response: Err(()),
                }),
                Duration::from_secs(1),
            ),
            (
                Box::new(FixedProvider {
                    name: "b",
                    response: Ok("from b".to_string()),
                }),
                Duration::from_secs(1),
            ),
        ]);
        assert_eq!(chain.complete("s", "p").await.unwrap(), "from b");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_through() {
        let chain = ProviderChain::from_providers(vec![
            (Box::new(SlowProvider), Duration::from_millis(100)),
            (
                Box::new(FixedProvider {
                    name: "b",
                    response: Ok("rescued".to_string()),
                }),
                Duration::from_secs(1),
            ),
        ]);
        assert_eq!(chain.complete("s", "p").await.unwrap(), "rescued");
    }

    #[tokio::test]
    async fn all_failed_reports_last_error() {
        let chain = ProviderChain::from_providers(vec![(
            Box::new(FixedProvider {
                name: "only",
                response: Err(()),
            }),
            Duration::from_secs(1),
        )]);
        let err = chain.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, ProviderError::AllFailed { .. }));
    }

    #[test]
    fn hybrid_chain_orders_local_first() {
        let config = ProviderConfig::default();
        let chain = ProviderChain::for_call(&config, CallKind::Classify);
        assert_eq!(chain.entries.len(), 2);
        assert_eq!(chain.entries[0].provider.name(), "ollama");
        assert_eq!(chain.entries[0].timeout, Duration::from_secs(3));
        assert_eq!(chain.entries[1].provider.name(), "gemini");
    }

    #[test]
    fn local_mode_uses_longer_deadline() {
        let config = ProviderConfig {
            mode: ConnectionMode::Local,
            ..Default::default()
        };
        let chain = ProviderChain::for_call(&config, CallKind::Review);
        assert_eq!(chain.entries.len(), 1);
        assert_eq!(chain.entries[0].timeout, Duration::from_secs(10));
    }
}
