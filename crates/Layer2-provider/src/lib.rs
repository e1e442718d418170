//! # maum-provider
//!
//! AI provider abstraction layer for MaumTalk.
//! 네트워크 vendor들과 로컬 폴백을 하나의 계약 뒤에 숨깁니다.
//!
//! ## Features
//! - Uniform provider contract (generate / is_healthy / remaining_quota)
//! - Structured error taxonomy (retryable vs recoverable 분리)
//! - Bounded retry with exponential backoff

pub mod error;
pub mod providers;
pub mod retry;
pub mod r#trait;

// Core trait and types
pub use r#trait::{Provider, ProviderMetadata, ProviderReply};

// Error and retry
pub use error::{ErrorCode, ProviderError};
pub use retry::{with_retry, RetryConfig};

// Provider implementations
pub use providers::anthropic::AnthropicProvider;
pub use providers::local::LocalProvider;
pub use providers::openai::OpenAiProvider;
