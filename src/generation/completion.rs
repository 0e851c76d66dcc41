//! OpenAI 호환 /completions 백엔드 (vLLM 등)
//!
//! `echo: true`로 요청하므로 응답이 프롬프트로 시작합니다.
//! Causal 모드로 사용해서 앞부분을 잘라냅니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GenerationRequest, TextGeneration};

/// Completion 엔드포인트 구현체
#[derive(Debug)]
pub struct CompletionGeneration {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CompletionGeneration {
    /// 베이스 URL과 모델로 생성
    ///
    /// `OPENAI_API_KEY`가 있으면 Bearer 토큰으로 보냅니다.
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/completions", self.base_url)
    }
}

#[async_trait]
impl TextGeneration for CompletionGeneration {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            prompt: &request.prompt,
            max_tokens: request.max_length,
            temperature: request.temperature,
            echo: true,
        };

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            anyhow::bail!("Completion API error ({}): {}", status, text);
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&text).context("Failed to parse completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| anyhow::anyhow!("Completion response has no choices"))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: usize,
    temperature: f32,
    echo: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
}

// ============================================================================
// Tests
// ============================================================================
