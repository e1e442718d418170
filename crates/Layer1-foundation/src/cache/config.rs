//! Cache configuration

use serde::{Deserialize, Serialize};

/// Configuration for the response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries before eviction kicks in
    pub max_entries: usize,

    /// Default time-to-live in milliseconds
    pub default_ttl_ms: u64,

    /// 이 값보다 낮은 confidence의 응답은 저장하지 않음
    pub min_confidence_to_cache: f32,

    /// 만료 엔트리 정리 주기 (밀리초)
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 200,
            default_ttl_ms: 5 * 60 * 1000, // 5 minutes
            min_confidence_to_cache: 0.6,
            sweep_interval_ms: 60 * 1000,
        }
    }
}

impl CacheConfig {
    /// 캐시를 사실상 끄는 설정 (테스트/디버깅용)
    pub fn minimal() -> Self {
        Self {
            max_entries: 8,
            default_ttl_ms: 1000,
            min_confidence_to_cache: 1.0,
            sweep_interval_ms: 500,
        }
    }
}
