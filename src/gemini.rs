//! Gemini API client for the financial assistant
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! Models are tried in configured order; the first success wins.

use crate::advisor::{Completion, CompletionProvider};
use crate::config::GeminiConfig;
use crate::error::InsightError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

/// Carries the API key; request URLs end up in reqwest error messages
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Generate a response from one model
    pub async fn generate(&self, model: &str, prompt: &str) -> crate::Result<Completion> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
        };

        info!(model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(model, "Gemini API request failed: {}", e);
                InsightError::ExternalService(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(model, %status, "Gemini API error response: {}", error_text);
            return Err(InsightError::ExternalService(format!(
                "Gemini returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!(model, "Failed to parse Gemini response: {}", e);
            InsightError::ExternalService(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response.candidates.first().ok_or_else(|| {
            InsightError::ExternalService("No response from Gemini API".to_string())
        })?;

        let text = candidate
            .content
            .parts
            .first()
            .map(|p| p.text.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| InsightError::ExternalService("Empty response from Gemini".to_string()))?;

        let confidence = calculate_confidence(candidate.finish_reason.as_deref(), text.len());

        if let Some(usage) = &gemini_response.usage_metadata {
            info!(
                model,
                prompt_tokens = usage.prompt_token_count,
                answer_tokens = usage.candidates_token_count,
                confidence,
                "Gemini response received"
            );
        }

        Ok(Completion {
            text,
            model: model.to_string(),
            confidence,
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> crate::Result<Completion> {
        let mut last_error = None;

        for model in &self.config.models {
            match self.generate(model, prompt).await {
                Ok(completion) => return Ok(completion),
                Err(e) => {
                    warn!(model = %model, "Model failed, trying next: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            InsightError::ExternalService("No Gemini models configured".to_string())
        }))
    }
}

const SYSTEM_PROMPT: &str = r#"You are a professional personal finance advisor.

Guidelines:
- Base every statement on the financial data summary provided
- Be structured and concise
- Quote concrete amounts and percentages
- Emphasize budgeting, saving and risk awareness
- Do not recommend specific securities

Format: Markdown with short sections and bullet points."#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i32,
    #[serde(default)]
    candidates_token_count: i32,
}

/// Response confidence from finish reason and answer length
fn calculate_confidence(finish_reason: Option<&str>, response_length: usize) -> f32 {
    let base_confidence: f32 = 0.85;

    let finish_confidence = match finish_reason {
        Some("STOP") => 1.0,
        Some("MAX_TOKENS") => 0.8,
        Some("SAFETY") => 0.6,
        _ => 0.7,
    };

    let length_confidence = if response_length < 50 {
        0.6
    } else if response_length > 2000 {
        0.8
    } else {
        1.0
    };

    (base_confidence * finish_confidence * length_confidence).clamp(0.5, 0.98)
}
