//! Provider trait and common types
//!
//! 모든 백엔드(네트워크 vendor, 로컬 폴백)는 이 계약 하나로 통일됩니다.
//! 오케스트레이터는 vendor별 요청/응답 형태를 전혀 모릅니다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use maum_foundation::{ChatRequest, FinishReason, TokenUsage};

/// Provider metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Provider ID (e.g., "anthropic")
    pub id: String,

    /// Display name (e.g., "Anthropic")
    pub display_name: String,

    /// Model id requested from this backend
    pub model: String,

    /// Base URL (로컬 폴백은 None)
    pub base_url: Option<String>,
}

/// Raw reply from a backend, before the engine decorates it
/// (emotion, confidence, cache flag, latency는 오케스트레이터가 붙임)
#[derive(Debug, Clone)]
pub struct ProviderReply {
    /// Text content
    pub content: String,

    /// Token usage reported (or estimated) by the backend
    pub usage: TokenUsage,

    /// Finish reason
    pub finish_reason: FinishReason,

    /// Model that actually served the request
    pub model: String,
}

/// AI provider contract
///
/// Implement this trait to add support for a new backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get provider metadata
    fn metadata(&self) -> &ProviderMetadata;

    /// Produce a chat completion for the request.
    ///
    /// 실패는 구조화된 ProviderError로 보고합니다. 타임아웃 경쟁은
    /// 호출자(오케스트레이터)가 담당합니다.
    async fn generate(&self, request: &ChatRequest) -> Result<ProviderReply, ProviderError>;

    /// Check if the provider is able to serve requests
    async fn is_healthy(&self) -> bool;

    /// Remaining quota if the backend exposes one (None = unknown)
    fn remaining_quota(&self) -> Option<u64> {
        None
    }
}
