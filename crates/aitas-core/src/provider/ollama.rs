//! Local Ollama backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::CompletionProvider;
use crate::error::ProviderError;

/// Non-streaming chat client for a local Ollama server.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        OllamaProvider {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Quick reachability probe against the tags endpoint.
    pub async fn is_reachable(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": prompt },
            ],
            "stream": false,
        });

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: "ollama".to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::BadStatus {
                provider: "ollama".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|_| ProviderError::MalformedResponse {
                provider: "ollama".to_string(),
            })?;

        data.pointer("/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or(ProviderError::MalformedResponse {
                provider: "ollama".to_string(),
            })
    }
}
