//! Provider Configuration - 백엔드별 설정
//!
//! 우선순위, 활성화 여부, 토큰/비용 한도 등 provider 레지스트리가
//! 초기화 시점에 읽는 값들입니다. 초기화 이후에는 읽기 전용입니다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    Openai,
    /// 항상 사용 가능한 로컬 폴백
    Local,
}

/// Per-provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// 백엔드 종류
    pub kind: ProviderKind,

    /// Ordering priority - lower is preferred
    pub priority: u32,

    /// Whether this provider participates in selection
    pub enabled: bool,

    /// Model id to request
    pub model: String,

    /// API key (없으면 환경변수에서 찾음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Max output tokens for this provider
    pub max_tokens: u32,

    /// 1k 토큰당 비용 (USD)
    pub cost_per_1k_tokens: f64,

    /// 분당 요청 한도
    pub requests_per_minute: u32,

    /// 분당 토큰 한도
    pub tokens_per_minute: u64,

    /// 일일 토큰 예산
    pub daily_token_limit: u64,

    /// 배치 생성 지원 여부 (capability flag)
    #[serde(default)]
    pub supports_batching: bool,
}

impl ProviderSettings {
    /// Anthropic 기본 설정
    pub fn anthropic() -> Self {
        Self {
            kind: ProviderKind::Anthropic,
            priority: 1,
            enabled: true,
            model: "claude-3-5-haiku-20241022".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: 1024,
            cost_per_1k_tokens: 0.004,
            requests_per_minute: 60,
            tokens_per_minute: 50_000,
            daily_token_limit: 1_000_000,
            supports_batching: true,
        }
    }

    /// OpenAI 기본 설정
    pub fn openai() -> Self {
        Self {
            kind: ProviderKind::Openai,
            priority: 2,
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: 1024,
            cost_per_1k_tokens: 0.0006,
            requests_per_minute: 60,
            tokens_per_minute: 50_000,
            daily_token_limit: 1_000_000,
            supports_batching: true,
        }
    }

    /// 로컬 폴백 기본 설정
    pub fn local() -> Self {
        Self {
            kind: ProviderKind::Local,
            priority: 99,
            enabled: true,
            model: "maum-local-template".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: 256,
            cost_per_1k_tokens: 0.0,
            requests_per_minute: 600,
            tokens_per_minute: 1_000_000,
            daily_token_limit: u64::MAX,
            supports_batching: false,
        }
    }

    /// API 키 결정: 설정값 우선, 없으면 종류별 환경변수
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }

        let env_var = match self.kind {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Local => return None,
        };
        std::env::var(env_var).ok().filter(|k| !k.is_empty())
    }
}

/// Provider registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// name → settings
    pub providers: BTreeMap<String, ProviderSettings>,

    /// 기본 선호 provider (없으면 priority가 가장 낮은 것)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert("anthropic".to_string(), ProviderSettings::anthropic());
        providers.insert("openai".to_string(), ProviderSettings::openai());
        providers.insert("local".to_string(), ProviderSettings::local());

        Self {
            providers,
            default: Some("anthropic".to_string()),
        }
    }
}

impl ProviderConfig {
    /// 활성화된 provider들을 priority 오름차순으로
    pub fn list_enabled(&self) -> Vec<(&String, &ProviderSettings)> {
        let mut enabled: Vec<_> = self
            .providers
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .collect();
        enabled.sort_by_key(|(name, settings)| (settings.priority, name.as_str()));
        enabled
    }

    pub fn get(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name)
    }
}
