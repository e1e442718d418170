//! Provider registry
//!
//! 오케스트레이터가 배타적으로 소유하는 provider 목록. 초기화 이후에는
//! 읽기 전용입니다. 폴백 시도 순서도 여기서 결정됩니다.

use std::collections::HashMap;
use std::sync::Arc;

use maum_foundation::{ProviderKind, ProviderSettings};
use maum_provider::Provider;

/// Registry-owned snapshot of one provider's configuration.
///
/// 배치 지원 여부는 타입 검사 대신 capability 플래그로 표현합니다.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Unique name (registry key)
    pub name: String,

    /// Ordering priority - lower is preferred
    pub priority: u32,

    /// Whether this provider participates in selection
    pub enabled: bool,

    /// 1k 토큰당 비용 (USD)
    pub cost_per_1k_tokens: f64,

    /// Max output tokens
    pub max_tokens: u32,

    /// 항상 사용 가능한 로컬 폴백인가 - 시도 순서의 맨 끝
    pub is_fallback: bool,

    /// 배치 생성 지원 여부
    pub supports_batching: bool,

    /// 분당 요청 한도
    pub requests_per_minute: u32,

    /// 분당 토큰 한도
    pub tokens_per_minute: u64,

    /// 일일 토큰 예산
    pub daily_token_limit: u64,
}

impl ProviderDescriptor {
    /// 설정 파일의 ProviderSettings에서 변환
    pub fn from_settings(name: impl Into<String>, settings: &ProviderSettings) -> Self {
        Self {
            name: name.into(),
            priority: settings.priority,
            enabled: settings.enabled,
            cost_per_1k_tokens: settings.cost_per_1k_tokens,
            max_tokens: settings.max_tokens,
            is_fallback: settings.kind == ProviderKind::Local,
            supports_batching: settings.supports_batching,
            requests_per_minute: settings.requests_per_minute,
            tokens_per_minute: settings.tokens_per_minute,
            daily_token_limit: settings.daily_token_limit,
        }
    }
}

struct Registered {
    descriptor: ProviderDescriptor,
    provider: Arc<dyn Provider>,
}

/// Provider registry - 이름 → (descriptor, 구현체)
#[derive(Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, Registered>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add a provider to the registry
    pub fn register(&mut self, descriptor: ProviderDescriptor, provider: Arc<dyn Provider>) {
        self.entries.insert(
            descriptor.name.clone(),
            Registered {
                descriptor,
                provider,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.entries.get(name).map(|r| r.provider.clone())
    }

    pub fn descriptor(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.entries.get(name).map(|r| &r.descriptor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderDescriptor, &Arc<dyn Provider>)> {
        self.entries
            .values()
            .map(|r| (r.descriptor.name.as_str(), &r.descriptor, &r.provider))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 폴백 시도 순서 결정.
    ///
    /// 1. 선호 provider (활성화되어 있으면)
    /// 2. 나머지 활성화된 비폴백 provider들 - priority 오름차순
    /// 3. 로컬 폴백 - 항상 마지막
    pub fn attempt_order(&self, preferred: Option<&str>) -> Vec<String> {
        let mut order = Vec::with_capacity(self.entries.len());

        let preferred = preferred.filter(|name| {
            self.entries
                .get(*name)
                .map(|r| r.descriptor.enabled)
                .unwrap_or(false)
        });

        if let Some(name) = preferred {
            order.push(name.to_string());
        }

        let mut rest: Vec<&ProviderDescriptor> = self
            .entries
            .values()
            .map(|r| &r.descriptor)
            .filter(|d| d.enabled && Some(d.name.as_str()) != preferred)
            .collect();
        rest.sort_by(|a, b| {
            (a.is_fallback, a.priority, a.name.as_str()).cmp(&(
                b.is_fallback,
                b.priority,
                b.name.as_str(),
            ))
        });

        order.extend(rest.into_iter().map(|d| d.name.clone()));
        order
    }
}
