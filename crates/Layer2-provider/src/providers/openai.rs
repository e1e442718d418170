//! OpenAI provider implementation (chat completions)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::ProviderError,
    r#trait::{Provider, ProviderMetadata, ProviderReply},
};
use maum_foundation::{ChatRequest, FinishReason, TokenUsage, TurnRole};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    metadata: ProviderMetadata,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self::with_base_url(api_key, model, max_tokens, OPENAI_API_URL)
    }

    /// OpenAI 호환 엔드포인트용 (프록시/self-hosted)
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        base_url: impl Into<String>,
    ) -> Self {
        let model = model.into();

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            metadata: ProviderMetadata {
                id: "openai".to_string(),
                display_name: "OpenAI".to_string(),
                model,
                base_url: Some(base_url.into()),
            },
            max_tokens,
        }
    }

    fn endpoint(&self) -> &str {
        self.metadata.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    fn build_request(&self, request: &ChatRequest) -> OpenAiRequest {
        // OpenAI는 시스템 턴도 messages에 그대로 포함
        let messages: Vec<OpenAiMessage> = request
            .turns
            .iter()
            .map(|t| OpenAiMessage {
                role: match t.role {
                    TurnRole::System => "system",
                    TurnRole::User => "user",
                    TurnRole::Assistant => "assistant",
                },
                content: t.content.clone(),
            })
            .collect();

        OpenAiRequest {
            model: self.metadata.model.clone(),
            messages,
            max_tokens: request.options.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.options.temperature,
        }
    }

    fn map_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::MaxTokens,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ProviderReply, ProviderError> {
        let body = self.build_request(request);
        debug!(model = %body.model, messages = body.messages.len(), "openai: sending request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
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

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("invalid response body: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Unknown("response had no choices".to_string()))?;

        Ok(ProviderReply {
            content: choice.message.content.unwrap_or_default(),
            usage: TokenUsage::new(parsed.usage.prompt_tokens, parsed.usage.completion_tokens),
            finish_reason: Self::map_finish_reason(choice.finish_reason.as_deref()),
            model: parsed.model,
        })
    }

    async fn is_healthy(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: OpenAiUsage,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
