//! Hosted Gemini backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::CompletionProvider;
use crate::error::ProviderError;

/// generateContent client for the Gemini API.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        GeminiProvider {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured {
                provider: "gemini".to_string(),
                message: "API key is not set".to_string(),
            });
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ],
        });

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: "gemini".to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::BadStatus {
                provider: "gemini".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|_| ProviderError::MalformedResponse {
                provider: "gemini".to_string(),
            })?;

        let parts = data
            .pointer("/candidates/0/content/parts")
            .and_then(|v| v.as_array())
            .ok_or(ProviderError::MalformedResponse {
                provider: "gemini".to_string(),
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn joins_candidate_parts() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                mockito::Matcher::Regex(r"^/v1beta/models/.*:generateContent.*$".to_string()),
            )
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"first "},{"text":"second"}]}}]}"#,
            )
            .create_async()
            .await;

        let provider = GeminiProvider::new(&server.url(), "key", "gemini-2.0-flash");
        let text = provider.complete("system", "hi").await.unwrap();
        assert_eq!(text, "first second");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let provider = GeminiProvider::new("http://127.0.0.1:1", "", "gemini-2.0-flash");
        let err = provider.complete("system", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn unexpected_shape_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                mockito::Matcher::Regex(r"^/v1beta/models/.*$".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let provider = GeminiProvider::new(&server.url(), "key", "gemini-2.0-flash");
        let err = provider.complete("system", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }
}
