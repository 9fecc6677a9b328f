//! OpenAI-compatible scoring oracle client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::types::{RecordSnapshot, ScoringKind};
use super::ScoringOracle;

/// Configuration for the HTTP scoring oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// API key
    pub api_key: String,
    /// Base URL override
    pub base_url: Option<String>,
    /// Model to score with
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Completion budget for the score array
    pub max_tokens: u32,
}

impl OracleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            max_tokens: 1024,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Scoring oracle backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiOracle {
    config: OracleConfig,
    http: Client,
}

impl OpenAiOracle {
    const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    pub fn new(config: OracleConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, http }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl ScoringOracle for OpenAiOracle {
    async fn score(&self, kind: ScoringKind, records: &[RecordSnapshot]) -> Result<Vec<f64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let payload = serde_json::to_string_pretty(records)
            .map_err(|e| Error::Oracle(format!("Failed to serialize records: {}", e)))?;

        let api_request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: kind.instruction().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Memories:\n{}", payload),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
        };

        let url = format!("{}/v1/chat/completions", self.base_url());

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Oracle(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Oracle(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
                return Err(Error::Oracle(format!("API error: {}", error.error.message)));
            }
            return Err(Error::Oracle(format!("API error ({}): {}", status, body)));
        }

        let api_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Oracle(format!("Failed to parse response: {}", e)))?;

        let content = api_response
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| Error::Oracle("No choices in response".to_string()))?;

        extract_scores(content, records.len())
    }
}

/// Extract the score array from oracle response text.
///
/// The oracle is instructed to return a bare JSON array, but responses may
/// wrap it in prose; parsing spans the first `[` to the last `]`.
pub fn extract_scores(text: &str, expected: usize) -> Result<Vec<f64>> {
    let start = text
        .find('[')
        .ok_or_else(|| Error::oracle("No JSON array in response"))?;
    let end = text
        .rfind(']')
        .filter(|&end| end > start)
        .ok_or_else(|| Error::oracle("No JSON array in response"))?;

    let scores: Vec<f64> = serde_json::from_str(&text[start..=end])
        .map_err(|e| Error::Oracle(format!("Malformed score array: {}", e)))?;

    if scores.len() != expected {
        return Err(Error::Oracle(format!(
            "Expected {} scores, got {}",
            expected,
            scores.len()
        )));
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_config_builder() {
        let config = OracleConfig::new("test-key")
            .with_base_url("https://custom.api.com")
            .with_model("gpt-4o")
            .with_timeout(10);

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, Some("https://custom.api.com".to_string()));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_extract_scores_bare_array() {
        let scores = extract_scores("[0.1, 0.5, 0.9]", 3).unwrap();
        assert_eq!(scores, vec![0.1, 0.5, 0.9]);
    }

    #[test]
    fn test_extract_scores_embedded_in_prose() {
        let text = "Here are the retention scores:\n[0.2, 0.8]\nLet me know if you need more.";
        let scores = extract_scores(text, 2).unwrap();
        assert_eq!(scores, vec![0.2, 0.8]);
    }

    #[test]
    fn test_extract_scores_no_array() {
        assert!(extract_scores("no scores here", 2).is_err());
        assert!(extract_scores("]0.5[", 1).is_err());
    }

    #[test]
    fn test_extract_scores_malformed() {
        assert!(extract_scores("[0.1, oops]", 2).is_err());
    }

    #[test]
    fn test_extract_scores_length_mismatch() {
        let error = extract_scores("[0.1, 0.5]", 3).unwrap_err();
        assert!(matches!(error, Error::Oracle(_)));
    }
}
