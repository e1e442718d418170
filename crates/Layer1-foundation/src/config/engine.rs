//! Engine Configuration - 재시도/차단기/큐 및 통합 설정
//!
//! 모든 노브는 외부에서 주입됩니다. 내부 상태가 아니라 설정입니다.

use serde::{Deserialize, Serialize};

use super::provider::ProviderConfig;
use crate::cache::CacheConfig;
use crate::storage::JsonStore;
use crate::Result;

/// 설정 파일명
pub const ENGINE_CONFIG_FILE: &str = "orchestrator.json";

// ============================================================================
// Retry
// ============================================================================

/// Retry behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// 같은 provider에 대한 최대 재시도 횟수
    pub max_retries: u32,

    /// 첫 재시도 전 대기 (밀리초)
    pub base_delay_ms: u64,

    /// 재시도 대기 상한 (밀리초)
    pub max_delay_ms: u64,

    /// 지수 백오프 배수
    pub backoff_multiplier: f64,

    /// 재시도 대상 에러 코드 (예: "RATE_LIMIT_EXCEEDED")
    pub retryable_codes: Vec<String>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            retryable_codes: vec![
                "RATE_LIMIT_EXCEEDED".to_string(),
                "NETWORK_ERROR".to_string(),
                "TIMEOUT".to_string(),
                "SERVER_ERROR".to_string(),
            ],
        }
    }
}

// ============================================================================
// Circuit Breaker
// ============================================================================

/// Circuit breaker settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// 연속 실패 임계치 - 도달하면 회로가 열림
    pub failure_threshold: u32,

    /// 열린 회로가 half-open 프로브를 허용하기까지의 시간 (밀리초)
    pub recovery_timeout_ms: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
        }
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Overflow queue settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Drain 루프가 엔트리 사이에 쉬는 시간 (밀리초)
    pub drain_yield_ms: u64,

    /// 큐에서 기다리는 요청의 최대 대기 시간 (밀리초)
    pub queue_timeout_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            drain_yield_ms: 100,
            queue_timeout_ms: 30_000,
        }
    }
}

// ============================================================================
// 통합 설정
// ============================================================================

/// Top-level orchestration engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Provider registry settings
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetrySettings,

    /// Circuit breaker
    #[serde(default)]
    pub breaker: BreakerSettings,

    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Overflow queue
    #[serde(default)]
    pub queue: QueueSettings,

    /// Provider 호출당 타임아웃 (밀리초)
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// 정규화 시 히스토리에 허용하는 최대 입력 토큰
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_max_context_tokens() -> usize {
    3_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            providers: ProviderConfig::default(),
            retry: RetrySettings::default(),
            breaker: BreakerSettings::default(),
            cache: CacheConfig::default(),
            queue: QueueSettings::default(),
            call_timeout_ms: default_call_timeout_ms(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

impl EngineConfig {
    /// 개발용 프로파일 (짧은 타임아웃, 느슨한 회로)
    pub fn development() -> Self {
        Self {
            breaker: BreakerSettings {
                failure_threshold: 3,
                recovery_timeout_ms: 10_000,
            },
            queue: QueueSettings {
                drain_yield_ms: 20,
                queue_timeout_ms: 10_000,
            },
            call_timeout_ms: 10_000,
            ..Self::default()
        }
    }

    /// 프로덕션용 프로파일
    pub fn production() -> Self {
        Self::default()
    }

    /// 글로벌 설정 로드
    pub fn load_global() -> Result<Self> {
        let store = JsonStore::global()?;
        Ok(store.load_or_default(ENGINE_CONFIG_FILE))
    }

    /// 프로젝트 설정 로드
    pub fn load_project() -> Result<Self> {
        let store = JsonStore::current_project()?;
        store.load(ENGINE_CONFIG_FILE)
    }

    /// 설정 로드 - 프로젝트 파일이 있으면 그것을, 없으면 글로벌을 사용
    pub fn load() -> Result<Self> {
        if let Ok(store) = JsonStore::current_project() {
            if store.exists(ENGINE_CONFIG_FILE) {
                return Self::load_project();
            }
        }
        Self::load_global()
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        let store = JsonStore::global()?;
        store.save(ENGINE_CONFIG_FILE, self)
    }
}
