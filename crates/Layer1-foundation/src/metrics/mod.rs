//! Performance monitoring
//!
//! Provider별 호출 레이턴시/성공 샘플을 관찰용으로만 수집합니다.
//! 제어 흐름(선택, 차단, 재시도)에는 절대 관여하지 않습니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// 샘플 윈도우 기본 크기 (provider당)
const DEFAULT_MAX_SAMPLES: usize = 256;

/// Provider별 누적 상태.
///
/// 레이턴시 샘플은 윈도우로 잘라 보관하고, 호출/에러 카운트는 수명
/// 전체에 걸쳐 누적합니다.
#[derive(Debug, Default)]
struct ProviderWindow {
    latencies: VecDeque<u64>,
    total_calls: u64,
    total_errors: u64,
    error_counts: HashMap<String, u64>,
}

/// Aggregated metrics for one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetrics {
    pub calls: u64,
    pub errors: u64,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    /// 에러 코드별 발생 횟수
    pub error_counts: BTreeMap<String, u64>,
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub providers: BTreeMap<String, ProviderMetrics>,
}

/// Records per-provider latency/outcome samples
#[derive(Debug)]
pub struct PerformanceMonitor {
    max_samples: usize,
    providers: HashMap<String, ProviderWindow>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_MAX_SAMPLES)
    }

    /// 샘플 윈도우 크기 지정
    pub fn with_window(max_samples: usize) -> Self {
        Self {
            max_samples: max_samples.max(1),
            providers: HashMap::new(),
        }
    }

    /// Record a successful call
    pub fn record_success(&mut self, provider: &str, latency_ms: u64) {
        self.record(provider, latency_ms, true, None);
    }

    /// Record a failed call with its error code
    pub fn record_error(&mut self, provider: &str, latency_ms: u64, code: &str) {
        self.record(provider, latency_ms, false, Some(code));
    }

    fn record(&mut self, provider: &str, latency_ms: u64, success: bool, code: Option<&str>) {
        let window = self.providers.entry(provider.to_string()).or_default();

        window.total_calls += 1;
        if !success {
            window.total_errors += 1;
            if let Some(code) = code {
                *window.error_counts.entry(code.to_string()).or_insert(0) += 1;
            }
        }

        window.latencies.push_back(latency_ms);
        while window.latencies.len() > self.max_samples {
            window.latencies.pop_front();
        }
    }

    /// 현재까지의 집계 스냅샷
    pub fn snapshot(&self) -> MetricsSnapshot {
        let providers = self
            .providers
            .iter()
            .map(|(name, window)| (name.clone(), summarize(window)))
            .collect();

        MetricsSnapshot {
            generated_at: Utc::now(),
            providers,
        }
    }

    /// 모든 샘플 제거 (shutdown 경로)
    pub fn reset(&mut self) {
        self.providers.clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(window: &ProviderWindow) -> ProviderMetrics {
    let mut latencies: Vec<u64> = window.latencies.iter().copied().collect();
    latencies.sort_unstable();

    let avg = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
    };

    let success_rate = if window.total_calls > 0 {
        (window.total_calls - window.total_errors) as f64 / window.total_calls as f64
    } else {
        0.0
    };

    ProviderMetrics {
        calls: window.total_calls,
        errors: window.total_errors,
        success_rate,
        avg_latency_ms: avg,
        p50_latency_ms: percentile(&latencies, 50),
        p95_latency_ms: percentile(&latencies, 95),
        error_counts: window.error_counts.iter().map(|(k, v)| (k.clone(), *v)).collect(),
    }
}

/// 정렬된 샘플에서 백분위 값 (nearest-rank)
fn percentile(sorted: &[u64], pct: u32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (pct as usize * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}
