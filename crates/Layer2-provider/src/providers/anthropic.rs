//! Anthropic (Claude) provider implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::ProviderError,
    r#trait::{Provider, ProviderMetadata, ProviderReply},
};
use maum_foundation::{ChatRequest, FinishReason, TokenUsage, TurnRole};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    metadata: ProviderMetadata,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        let model = model.into();

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            metadata: ProviderMetadata {
                id: "anthropic".to_string(),
                display_name: "Anthropic".to_string(),
                model,
                base_url: Some(ANTHROPIC_API_URL.to_string()),
            },
            max_tokens,
        }
    }

    /// Build request body for the Messages API
    fn build_request(&self, request: &ChatRequest) -> AnthropicRequest {
        // 시스템 턴은 messages가 아니라 system 파라미터로
        let system = request
            .turns
            .iter()
            .find(|t| t.role == TurnRole::System)
            .map(|t| t.content.clone());

        let messages: Vec<AnthropicMessage> = request
            .turns
            .iter()
            .filter(|t| t.role != TurnRole::System)
            .map(|t| AnthropicMessage {
                role: match t.role {
                    TurnRole::Assistant => "assistant",
                    _ => "user",
                },
                content: t.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.metadata.model.clone(),
            max_tokens: request.options.max_tokens.unwrap_or(self.max_tokens),
            system,
            messages,
            temperature: request.options.temperature,
        }
    }

    fn map_stop_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::MaxTokens,
            _ => FinishReason::Other,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ProviderReply, ProviderError> {
        let body = self.build_request(request);
        debug!(model = %body.model, messages = body.messages.len(), "anthropic: sending request");

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, &body));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("invalid response body: {}", e)))?;

        let content = parsed
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(ProviderReply {
            content,
            usage: TokenUsage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
            finish_reason: Self::map_stop_reason(parsed.stop_reason.as_deref()),
            model: parsed.model,
        })
    }

    async fn is_healthy(&self) -> bool {
        // 네트워크 프로브 없이 키 존재만 확인 - vendor에 ping 엔드포인트가 없음
        !self.api_key.is_empty()
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
    stop_reason: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
