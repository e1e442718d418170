//! Usage & cost accounting
//!
//! 전체/provider별 요청·토큰·비용 누적. getUsageStats() 스냅샷의
//! 데이터 소스입니다.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Provider별 누적 사용량
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProviderUsage {
    pub requests: u64,
    pub errors: u64,
    pub tokens: u64,
    pub cost_usd: f64,
}

/// Point-in-time usage snapshot
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    /// 사용자에게 degraded 응답이 나간 비율
    pub error_rate: f64,
    pub cache_hit_rate: f64,
    pub per_provider: BTreeMap<String, ProviderUsage>,
}

/// Accumulates usage across the engine's lifetime
#[derive(Debug, Default)]
pub struct UsageTracker {
    total_requests: u64,
    failed_requests: u64,
    total_tokens: u64,
    total_cost_usd: f64,
    per_provider: HashMap<String, ProviderUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider 호출이 성공해서 응답이 나감
    pub fn record_success(&mut self, provider: &str, tokens: u64, cost_usd: f64) {
        self.total_requests += 1;
        self.total_tokens += tokens;
        self.total_cost_usd += cost_usd;

        let entry = self.per_provider.entry(provider.to_string()).or_default();
        entry.requests += 1;
        entry.tokens += tokens;
        entry.cost_usd += cost_usd;
    }

    /// 캐시에서 응답이 나감 (provider 호출 없음)
    pub fn record_cache_hit(&mut self) {
        self.total_requests += 1;
    }

    /// 개별 provider 호출 실패 (요청 자체는 폴백으로 살아날 수 있음)
    pub fn record_provider_error(&mut self, provider: &str) {
        self.per_provider
            .entry(provider.to_string())
            .or_default()
            .errors += 1;
    }

    /// 파이프라인 전체 실패 - degraded 응답이 나감
    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
    }

    pub fn snapshot(&self, cache_hit_rate: f64) -> UsageStats {
        let error_rate = if self.total_requests > 0 {
            self.failed_requests as f64 / self.total_requests as f64
        } else {
            0.0
        };

        UsageStats {
            total_requests: self.total_requests,
            total_tokens: self.total_tokens,
            total_cost_usd: self.total_cost_usd,
            error_rate,
            cache_hit_rate,
            per_provider: self
                .per_provider
                .iter()
                .map(|(name, usage)| (name.clone(), *usage))
                .collect(),
        }
    }
}
