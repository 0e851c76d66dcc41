//! Gemini generateContent 백엔드
//!
//! 응답에는 생성된 텍스트만 들어 있으므로 Seq2Seq 모드로 사용합니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::get_api_key;

use super::{GenerationRequest, TextGeneration};

/// Gemini API 베이스 URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini 텍스트 생성 구현체
#[derive(Debug)]
pub struct GeminiGeneration {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiGeneration {
    pub fn new(api_key: String, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: model.to_string(),
            client,
        })
    }

    /// 환경변수의 API 키로 생성
    pub fn from_env(model: &str) -> Result<Self> {
        Self::new(get_api_key()?, model)
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }
}

#[async_trait]
impl TextGeneration for GeminiGeneration {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let body = GenerateRequest::from(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send generation request")?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, text);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).context("Failed to parse generation response")?;

        Ok(parsed.text())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

impl From<&GenerationRequest> for GenerateRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_length as u32,
            },
        }
    }
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
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// 첫 후보의 텍스트 파트를 이어 붙임
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

// ============================================================================
// Tests
// ============================================================================
