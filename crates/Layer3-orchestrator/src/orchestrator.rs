//! Orchestrator - 요청 한 건의 전체 수명을 책임지는 최상위 컴포넌트
//!
//! submit() 한 번에 일어나는 일:
//! 정규화 → 지문 계산 → 캐시 조회 → provider 선택 → admission control →
//! 재시도/폴백 실행 → 감정/신뢰도 장식 → 캐시 기록 → 통계.
//! 시스템이 바쁘면 우선순위 큐에 넣고 drain 루프가 처리합니다.
//!
//! 동시성 모델: 모든 가변 상태(차단기, 리미터, 캐시, 큐)는 짧은 동기
//! 구간에서만 잠그고, await를 넘어 잠금을 들고 가지 않습니다. 처리 경로는
//! 한 번에 하나(processing 플래그)이므로 check-then-act가 안전합니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::breaker::CircuitBreaker;
use crate::emotion;
use crate::limiter::{RateLimiter, RateLimits};
use crate::normalize::RequestNormalizer;
use crate::queue::{QueueEntry, RequestQueue};
use crate::registry::{ProviderDescriptor, ProviderRegistry};
use crate::usage::{UsageStats, UsageTracker};
use maum_foundation::{
    request_fingerprint, CharEstimator, ChatRequest, ChatResponse, EmotionTag, EngineConfig, Error,
    FinishReason, MetricsSnapshot, PerformanceMonitor, Priority, ProviderKind, ResponseCache,
    ResponseMeta, Result, TokenEstimator,
};
use maum_provider::{
    with_retry, AnthropicProvider, LocalProvider, OpenAiProvider, Provider, ProviderError,
    ProviderReply, RetryConfig,
};

/// 파이프라인이 완전히 실패했을 때 내보내는 중립 응답
const DEGRADED_LINE: &str =
    "미안해요, 지금은 생각이 잘 정리되지 않네요. 잠시 후에 다시 이야기해 줄래요?";

/// Queue occupancy snapshot
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStatus {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
    pub total: usize,
    pub is_processing: bool,
}

/// The orchestration engine.
///
/// 레지스트리, 차단기 맵, 리미터 맵, 캐시, 큐를 배타적으로 소유하는
/// 명시적 인스턴스입니다. 전역 상태는 없습니다.
pub struct Orchestrator {
    registry: ProviderRegistry,
    preferred: Option<String>,

    breakers: Mutex<HashMap<String, CircuitBreaker>>,
    limiters: Mutex<HashMap<String, RateLimiter>>,
    cache: Mutex<ResponseCache>,
    monitor: Mutex<PerformanceMonitor>,
    usage: Mutex<UsageTracker>,
    queue: Mutex<RequestQueue>,

    /// Drain-loop guard - 처리 경로는 한 번에 하나
    processing: AtomicBool,

    normalizer: RequestNormalizer,
    estimator: Arc<dyn TokenEstimator>,
    retry: RetryConfig,
    call_timeout: Duration,
    drain_yield: Duration,
    queue_timeout: Duration,
    sweep_interval: Duration,

    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Orchestrator {
    /// 설정에서 전체 엔진 구성 (provider 생성 + 스위퍼 시작)
    pub fn from_config(config: &EngineConfig) -> Result<Arc<Self>> {
        let mut registry = ProviderRegistry::new();

        for (name, settings) in config.providers.list_enabled() {
            let api_key = settings.resolve_api_key().unwrap_or_default();
            let provider: Arc<dyn Provider> = match settings.kind {
                ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
                    api_key,
                    &settings.model,
                    settings.max_tokens,
                )),
                ProviderKind::Openai => match &settings.base_url {
                    Some(url) => Arc::new(OpenAiProvider::with_base_url(
                        api_key,
                        &settings.model,
                        settings.max_tokens,
                        url,
                    )),
                    None => Arc::new(OpenAiProvider::new(
                        api_key,
                        &settings.model,
                        settings.max_tokens,
                    )),
                },
                ProviderKind::Local => Arc::new(LocalProvider::new()),
            };

            registry.register(ProviderDescriptor::from_settings(name, settings), provider);
        }

        if registry.is_empty() {
            return Err(Error::Config(
                "No providers configured. Enable at least one provider (the local fallback counts)."
                    .to_string(),
            ));
        }

        let orchestrator = Self::with_registry(registry, config);
        Self::start_sweeper(&orchestrator);
        Ok(orchestrator)
    }

    /// 이미 구성된 레지스트리로 엔진 생성 (스위퍼는 시작하지 않음)
    pub fn with_registry(registry: ProviderRegistry, config: &EngineConfig) -> Arc<Self> {
        let estimator: Arc<dyn TokenEstimator> = Arc::new(CharEstimator::new());

        let breakers = registry
            .names()
            .into_iter()
            .map(|name| (name.to_string(), CircuitBreaker::new(config.breaker)))
            .collect();

        let limiters = registry
            .iter()
            .map(|(name, descriptor, _)| {
                (
                    name.to_string(),
                    RateLimiter::new(RateLimits::from_descriptor(descriptor)),
                )
            })
            .collect();

        Arc::new(Self {
            registry,
            preferred: config.providers.default.clone(),
            breakers: Mutex::new(breakers),
            limiters: Mutex::new(limiters),
            cache: Mutex::new(ResponseCache::new(config.cache.clone())),
            monitor: Mutex::new(PerformanceMonitor::new()),
            usage: Mutex::new(UsageTracker::new()),
            queue: Mutex::new(RequestQueue::new()),
            processing: AtomicBool::new(false),
            normalizer: RequestNormalizer::new(estimator.clone(), config.max_context_tokens),
            estimator,
            retry: RetryConfig::from_settings(&config.retry),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            drain_yield: Duration::from_millis(config.queue.drain_yield_ms),
            queue_timeout: Duration::from_millis(config.queue.queue_timeout_ms),
            sweep_interval: Duration::from_millis(config.cache.sweep_interval_ms),
            sweeper: Mutex::new(None),
        })
    }

    /// 만료 캐시 엔트리를 주기적으로 청소하는 백그라운드 태스크 시작
    pub fn start_sweeper(this: &Arc<Self>) {
        let weak = Arc::downgrade(this);
        let interval = this.sweep_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // 첫 틱은 즉시 발화하므로 건너뜀
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(orchestrator) => {
                        let removed = orchestrator.cache.lock().sweep();
                        if removed > 0 {
                            debug!(removed, "cache sweep");
                        }
                    }
                    None => break,
                }
            }
        });

        *this.sweeper.lock() = Some(handle);
    }

    // ========================================================================
    // 요청 제출
    // ========================================================================

    /// Submit a chat request.
    ///
    /// 시스템이 놀고 있으면 즉시 처리하고, 바쁘면 큐에 넣고 drain 루프의
    /// 완료 콜백을 기다립니다. 파이프라인 실패는 degraded 응답으로
    /// 합성되므로, 에러는 큐 타임아웃/청소 경로에서만 반환됩니다.
    pub async fn submit(&self, request: ChatRequest, priority: Priority) -> Result<ChatResponse> {
        let correlation = Uuid::new_v4();
        let mut request = request;
        self.normalizer.normalize(&mut request);

        if !self.processing.swap(true, Ordering::SeqCst) {
            // idle → 직접 처리
            debug!(%correlation, "processing directly");
            let response = match self.process(&request).await {
                Ok(response) => response,
                Err(error) => self.degrade(&error),
            };
            self.drain().await;
            return Ok(response);
        }

        // busy → 큐에 등록하고 완료를 기다림
        debug!(%correlation, ?priority, "system busy, queueing request");
        let (tx, rx) = oneshot::channel();
        self.queue
            .lock()
            .enqueue(QueueEntry::new(correlation, request, priority, tx));

        // 줄 서는 사이에 drain 루프가 끝났을 수 있음 - 그 경우 우리가 이어받음
        if !self.processing.swap(true, Ordering::SeqCst) {
            self.drain().await;
        }

        match tokio::time::timeout(self.queue_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::QueueCleared),
            Err(_) => Err(Error::QueueTimeout(self.queue_timeout.as_millis() as u64)),
        }
    }

    // ========================================================================
    // 처리 파이프라인
    // ========================================================================

    /// 캐시 조회 → 시도 순서 결정 → 차단기/리미터 게이트 → 재시도 실행
    async fn process(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let started = Instant::now();
        let key = request_fingerprint(request);

        if let Some(mut cached) = self.cache.lock().get(key) {
            cached.id = Uuid::new_v4();
            cached.cached = true;
            cached.latency_ms = started.elapsed().as_millis() as u64;
            self.usage.lock().record_cache_hit();
            debug!("cache hit");
            return Ok(cached);
        }

        let estimated = self.estimator.estimate_request(request) as u64;
        let preferred = request
            .options
            .provider
            .as_deref()
            .or(self.preferred.as_deref());
        let order = self.registry.attempt_order(preferred);

        let mut last_error: Option<ProviderError> = None;

        for name in &order {
            // 1. 회로 차단기 게이트
            let open = self
                .breakers
                .lock()
                .get_mut(name)
                .map(|b| b.is_open())
                .unwrap_or(false);
            if open {
                debug!(provider = %name, "circuit open, skipping");
                continue;
            }

            // 2. Admission control (검사와 예약이 한 잠금 구간 안)
            let admitted = self
                .limiters
                .lock()
                .get_mut(name)
                .map(|l| l.can_admit(estimated))
                .unwrap_or(true);
            if !admitted {
                let delay = self.limiters.lock().get(name).and_then(|l| l.retry_delay());
                match delay {
                    Some(delay) => {
                        debug!(provider = %name, ?delay, "rate window full, skipping")
                    }
                    None => warn!(provider = %name, "daily token budget exhausted, skipping"),
                }
                continue;
            }

            let Some(provider) = self.registry.get(name) else {
                continue;
            };

            // 3. 타임아웃과 경쟁하는 재시도 실행
            let call_timeout = self.call_timeout;
            let attempts = AtomicU32::new(0);
            let call_started = Instant::now();

            let result = with_retry(&self.retry, name, || {
                attempts.fetch_add(1, Ordering::Relaxed);
                let provider = Arc::clone(&provider);
                async move {
                    match tokio::time::timeout(call_timeout, provider.generate(request)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout(format!(
                            "no response within {}ms",
                            call_timeout.as_millis()
                        ))),
                    }
                }
            })
            .await;

            let latency_ms = call_started.elapsed().as_millis() as u64;
            let retry_count = attempts.load(Ordering::Relaxed).saturating_sub(1);

            match result {
                Ok(reply) => {
                    if let Some(breaker) = self.breakers.lock().get_mut(name) {
                        breaker.record_success();
                    }
                    self.monitor.lock().record_success(name, latency_ms);

                    let response = self.decorate(reply, name, retry_count, started);
                    self.cache.lock().put(key, response.clone(), None);
                    self.usage.lock().record_success(
                        name,
                        response.usage.total() as u64,
                        response.meta.cost_usd,
                    );

                    info!(provider = %name, latency_ms, retry_count, "request served");
                    return Ok(response);
                }
                Err(error) => {
                    if let Some(breaker) = self.breakers.lock().get_mut(name) {
                        breaker.record_failure();
                    }
                    self.monitor
                        .lock()
                        .record_error(name, latency_ms, error.code().as_str());
                    self.usage.lock().record_provider_error(name);

                    if !error.recoverable() {
                        warn!(provider = %name, code = %error.code(), "non-recoverable error, aborting fallback chain");
                        return Err(error.into());
                    }

                    warn!(provider = %name, code = %error.code(), "provider failed, trying next candidate");
                    last_error = Some(error);
                }
            }
        }

        Err(Error::AllProvidersUnavailable(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidate providers".to_string()),
        ))
    }

    /// Provider 원시 응답에 감정/신뢰도/비용을 입혀 최종 응답으로
    fn decorate(
        &self,
        reply: ProviderReply,
        provider_name: &str,
        retry_count: u32,
        started: Instant,
    ) -> ChatResponse {
        let emotion = emotion::classify(&reply.content);
        let confidence = emotion::confidence(&reply);

        let cost_usd = self
            .registry
            .descriptor(provider_name)
            .map(|d| d.cost_per_1k_tokens * reply.usage.total() as f64 / 1000.0)
            .unwrap_or(0.0);

        ChatResponse {
            id: Uuid::new_v4(),
            content: reply.content,
            emotion,
            confidence,
            usage: reply.usage,
            provider: provider_name.to_string(),
            cached: false,
            latency_ms: started.elapsed().as_millis() as u64,
            meta: ResponseMeta {
                finish_reason: reply.finish_reason,
                cost_usd,
                retry_count,
            },
        }
    }

    /// 파이프라인 실패를 degraded-but-valid 응답으로 합성.
    ///
    /// 호출자는 항상 잘 형성된 응답을 받지만, 실패는 error_rate에
    /// 그대로 집계됩니다.
    fn degrade(&self, error: &Error) -> ChatResponse {
        warn!(%error, "synthesizing degraded response");
        self.usage.lock().record_failure();

        let mut response = ChatResponse::new(DEGRADED_LINE, "degraded");
        response.emotion = EmotionTag::Neutral;
        response.confidence = 0.1;
        response.meta.finish_reason = FinishReason::Degraded;
        response
    }

    /// Drain loop - 큐가 빌 때까지 우선순위 순서로 처리.
    ///
    /// 한 엔트리의 실패가 루프를 멈추지 않으며, 엔트리 사이에 짧게
    /// 양보해 단일 provider 포화를 피합니다.
    async fn drain(&self) {
        loop {
            let entry = self.queue.lock().dequeue();
            match entry {
                Some(entry) => {
                    if entry.enqueued_at.elapsed() >= self.queue_timeout {
                        // 제출자는 이미 타임아웃으로 떠났음
                        let _ = entry.responder.send(Err(Error::QueueTimeout(
                            self.queue_timeout.as_millis() as u64,
                        )));
                        continue;
                    }

                    debug!(id = %entry.id, ?entry.priority, "draining queued request");
                    let result = match self.process(&entry.request).await {
                        Ok(response) => Ok(response),
                        Err(error) => Ok(self.degrade(&error)),
                    };
                    let _ = entry.responder.send(result);

                    tokio::time::sleep(self.drain_yield).await;
                }
                None => {
                    self.processing.store(false, Ordering::SeqCst);
                    // 비운 직후 끼어든 엔트리가 있으면 다시 이어받음
                    if self.queue.lock().is_empty()
                        || self.processing.swap(true, Ordering::SeqCst)
                    {
                        break;
                    }
                }
            }
        }
    }

    // ========================================================================
    // 조회/관리 API
    // ========================================================================

    /// 큐 점유 상태
    pub fn queue_status(&self) -> QueueStatus {
        let (high, normal, low) = self.queue.lock().tier_counts();
        QueueStatus {
            high,
            normal,
            low,
            total: high + normal + low,
            is_processing: self.processing.load(Ordering::SeqCst),
        }
    }

    /// 대기 중인 요청을 모두 버리고 콜백을 거부
    pub fn clear_queue(&self) -> usize {
        let entries = self.queue.lock().clear();
        let count = entries.len();
        for entry in entries {
            let _ = entry.responder.send(Err(Error::QueueCleared));
        }
        if count > 0 {
            info!(count, "queue cleared");
        }
        count
    }

    /// 각 provider의 isHealthy() 결과
    pub async fn health_status(&self) -> BTreeMap<String, bool> {
        let mut status = BTreeMap::new();
        for (name, _, provider) in self.registry.iter() {
            status.insert(name.to_string(), provider.is_healthy().await);
        }
        status
    }

    /// 누적 사용량 스냅샷
    pub fn usage_stats(&self) -> UsageStats {
        let cache_hit_rate = self.cache.lock().stats().hit_rate;
        self.usage.lock().snapshot(cache_hit_rate)
    }

    /// Provider별 레이턴시/성공 메트릭 스냅샷
    pub fn metrics(&self) -> MetricsSnapshot {
        self.monitor.lock().snapshot()
    }

    /// 스위퍼 중지, 캐시 비우기, 리미터 리셋, 대기 요청 거부
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        self.clear_queue();
        self.cache.lock().clear();
        for limiter in self.limiters.lock().values_mut() {
            limiter.reset();
        }
        info!("orchestrator shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maum_foundation::{
        BreakerSettings, ChatTurn, CompanionContext, ProviderConfig, QueueSettings, RetrySettings,
        TokenUsage,
    };
    use maum_provider::ProviderMetadata;

    // ========================================================================
    // 테스트용 Mock Provider
    // ========================================================================

    struct MockProvider {
        metadata: ProviderMetadata,
        calls: AtomicU32,
        fail_times: u32,
        error: ProviderError,
        seen: Mutex<Vec<String>>,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl MockProvider {
        fn new(name: &str) -> Arc<Self> {
            Self::failing(name, 0, ProviderError::Network("unused".into()))
        }

        fn failing(name: &str, fail_times: u32, error: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                metadata: ProviderMetadata {
                    id: name.to_string(),
                    display_name: name.to_string(),
                    model: "mock-1".to_string(),
                    base_url: None,
                },
                calls: AtomicU32::new(0),
                fail_times,
                error,
                seen: Mutex::new(Vec::new()),
                gate: Mutex::new(None),
            })
        }

        fn always_failing(name: &str, error: ProviderError) -> Arc<Self> {
            Self::failing(name, u32::MAX, error)
        }

        /// 첫 generate 호출을 signal까지 멈춰 세우는 게이트 설치
        fn gated(name: &str) -> (Arc<Self>, oneshot::Sender<()>) {
            let provider = Self::new(name);
            let (tx, rx) = oneshot::channel();
            *provider.gate.lock() = Some(rx);
            (provider, tx)
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn metadata(&self) -> &ProviderMetadata {
            &self.metadata
        }

        async fn generate(&self, request: &ChatRequest) -> std::result::Result<ProviderReply, ProviderError> {
            let gate = self.gate.lock().take();
            if let Some(rx) = gate {
                let _ = rx.await;
            }

            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(turn) = request.last_user_turn() {
                self.seen.lock().push(turn.content.clone());
            }

            if n < self.fail_times {
                return Err(self.error.clone());
            }

            let content = format!(
                "응답할게: {}",
                request
                    .last_user_turn()
                    .map(|t| t.content.as_str())
                    .unwrap_or("...")
            );
            Ok(ProviderReply {
                content,
                usage: TokenUsage::new(12, 8),
                finish_reason: FinishReason::Stop,
                model: "mock-1".to_string(),
            })
        }

        async fn is_healthy(&self) -> bool {
            true
        }
    }

    // ========================================================================
    // 테스트 헬퍼
    // ========================================================================

    fn descriptor(name: &str, priority: u32, is_fallback: bool) -> ProviderDescriptor {
        ProviderDescriptor {
            name: name.to_string(),
            priority,
            enabled: true,
            cost_per_1k_tokens: 0.002,
            max_tokens: 512,
            is_fallback,
            supports_batching: false,
            requests_per_minute: 600,
            tokens_per_minute: 100_000,
            daily_token_limit: 1_000_000,
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            providers: ProviderConfig {
                providers: Default::default(),
                default: None,
            },
            retry: RetrySettings {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 2,
                backoff_multiplier: 2.0,
                ..RetrySettings::default()
            },
            breaker: BreakerSettings {
                failure_threshold: 2,
                recovery_timeout_ms: 50,
            },
            queue: QueueSettings {
                drain_yield_ms: 1,
                queue_timeout_ms: 5000,
            },
            call_timeout_ms: 5000,
            ..EngineConfig::default()
        }
    }

    fn build(providers: Vec<(ProviderDescriptor, Arc<MockProvider>)>) -> Arc<Orchestrator> {
        let mut registry = ProviderRegistry::new();
        for (descriptor, provider) in providers {
            let provider: Arc<dyn Provider> = provider;
            registry.register(descriptor, provider);
        }
        Orchestrator::with_registry(registry, &test_config())
    }

    fn request(message: &str) -> ChatRequest {
        let ctx = CompanionContext::new("c-1", "하루");
        ChatRequest::new(vec![ChatTurn::user(message)], ctx)
    }

    // ========================================================================
    // 테스트
    // ========================================================================

    #[tokio::test]
    async fn test_identical_requests_hit_cache() {
        let mock = MockProvider::new("mock-a");
        let orch = build(vec![(descriptor("mock-a", 1, false), mock.clone())]);

        let first = orch
            .submit(request("오늘 하루 어땠어?"), Priority::Normal)
            .await
            .unwrap();
        let second = orch
            .submit(request("오늘 하루 어땠어?"), Priority::Normal)
            .await
            .unwrap();

        // provider는 한 번만 호출되고 두 번째 응답은 캐시에서
        assert_eq!(mock.calls(), 1);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.provider, "mock-a");
        assert_eq!(second.content, first.content);

        let stats = orch.usage_stats();
        assert_eq!(stats.total_requests, 2);
        assert!(stats.cache_hit_rate > 0.0);
    }

    #[tokio::test]
    async fn test_fallback_on_provider_failure() {
        let broken = MockProvider::always_failing("broken", ProviderError::Network("down".into()));
        let fallback = MockProvider::new("local");
        let orch = build(vec![
            (descriptor("broken", 1, false), broken.clone()),
            (descriptor("local", 99, true), fallback.clone()),
        ]);

        let response = orch.submit(request("안녕!"), Priority::Normal).await.unwrap();

        assert_eq!(response.provider, "local");
        assert_eq!(broken.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_breaker_opens_and_recovers() {
        let broken = MockProvider::always_failing("flaky", ProviderError::Network("down".into()));
        let orch = build(vec![(descriptor("flaky", 1, false), broken.clone())]);

        // 임계치(2)까지 실패 누적 - 둘 다 degraded 응답
        let r1 = orch.submit(request("m-1"), Priority::Normal).await.unwrap();
        let r2 = orch.submit(request("m-2"), Priority::Normal).await.unwrap();
        assert_eq!(r1.provider, "degraded");
        assert_eq!(r2.meta.finish_reason, FinishReason::Degraded);
        assert_eq!(broken.calls(), 2);

        // 회로 열림 → provider 호출 없이 degraded
        let r3 = orch.submit(request("m-3"), Priority::Normal).await.unwrap();
        assert_eq!(r3.provider, "degraded");
        assert_eq!(broken.calls(), 2);

        // 복구 타임아웃(50ms) 경과 → half-open 프로브 허용
        tokio::time::sleep(Duration::from_millis(60)).await;
        let _ = orch.submit(request("m-4"), Priority::Normal).await.unwrap();
        assert_eq!(broken.calls(), 3);
    }

    #[tokio::test]
    async fn test_degraded_response_is_well_formed_and_uncached() {
        let broken =
            MockProvider::always_failing("broken", ProviderError::InvalidCredentials("bad".into()));
        let orch = build(vec![(descriptor("broken", 1, false), broken.clone())]);

        let response = orch.submit(request("안녕!"), Priority::Normal).await.unwrap();

        assert_eq!(response.provider, "degraded");
        assert!(response.confidence <= 0.1);
        assert_eq!(response.meta.finish_reason, FinishReason::Degraded);
        assert!(!response.content.is_empty());

        // degraded는 캐시에 남지 않으므로 같은 요청이 다시 provider로 감
        let _ = orch.submit(request("안녕!"), Priority::Normal).await.unwrap();
        assert_eq!(broken.calls(), 2);

        let stats = orch.usage_stats();
        assert!(stats.error_rate > 0.9);
    }

    #[tokio::test]
    async fn test_non_recoverable_aborts_chain() {
        let broken =
            MockProvider::always_failing("broken", ProviderError::InvalidRequest("empty".into()));
        let fallback = MockProvider::new("local");
        let orch = build(vec![
            (descriptor("broken", 1, false), broken.clone()),
            (descriptor("local", 99, true), fallback.clone()),
        ]);

        let response = orch.submit(request("안녕!"), Priority::Normal).await.unwrap();

        // 체인 전체가 중단되므로 폴백도 호출되지 않음
        assert_eq!(response.provider, "degraded");
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_provider_is_skipped() {
        let primary = MockProvider::new("primary");
        let fallback = MockProvider::new("local");

        let mut tight = descriptor("primary", 1, false);
        tight.requests_per_minute = 1;

        let orch = build(vec![
            (tight, primary.clone()),
            (descriptor("local", 99, true), fallback.clone()),
        ]);

        let r1 = orch.submit(request("첫 번째"), Priority::Normal).await.unwrap();
        let r2 = orch.submit(request("두 번째"), Priority::Normal).await.unwrap();

        // 분당 1건 한도 → 두 번째는 폴백으로
        assert_eq!(r1.provider, "primary");
        assert_eq!(r2.provider, "local");
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_queue_drains_in_priority_order() {
        let (mock, gate) = MockProvider::gated("mock-a");
        let orch = build(vec![(descriptor("mock-a", 1, false), mock.clone())]);

        // 첫 요청이 게이트에 걸려 처리 중 상태 유지
        let first = tokio::spawn({
            let orch = orch.clone();
            async move { orch.submit(request("first"), Priority::Normal).await }
        });
        while !orch.queue_status().is_processing {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        // 바쁜 동안 low, high, normal, high 순서로 제출
        let mut handles = Vec::new();
        for (message, priority) in [
            ("low-1", Priority::Low),
            ("high-1", Priority::High),
            ("normal-1", Priority::Normal),
            ("high-2", Priority::High),
        ] {
            let expected = orch.queue_status().total + 1;
            handles.push(tokio::spawn({
                let orch = orch.clone();
                async move { orch.submit(request(message), priority).await }
            }));
            while orch.queue_status().total < expected {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        }

        // 게이트 해제 → 직접 처리 + drain
        let _ = gate.send(());
        first.await.unwrap().unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 드레인 순서: high, high, normal, low (티어 내 FIFO)
        assert_eq!(
            mock.seen(),
            vec!["first", "high-1", "high-2", "normal-1", "low-1"]
        );
        assert!(!orch.queue_status().is_processing);
    }

    #[tokio::test]
    async fn test_clear_queue_rejects_waiters() {
        let (mock, gate) = MockProvider::gated("mock-a");
        let orch = build(vec![(descriptor("mock-a", 1, false), mock.clone())]);

        let first = tokio::spawn({
            let orch = orch.clone();
            async move { orch.submit(request("first"), Priority::Normal).await }
        });
        while !orch.queue_status().is_processing {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let queued = tokio::spawn({
            let orch = orch.clone();
            async move { orch.submit(request("queued"), Priority::Normal).await }
        });
        while orch.queue_status().total < 1 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(orch.clear_queue(), 1);

        let result = queued.await.unwrap();
        assert!(matches!(result, Err(Error::QueueCleared)));

        let _ = gate.send(());
        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_health_status_covers_all_providers() {
        let orch = build(vec![
            (descriptor("a", 1, false), MockProvider::new("a")),
            (descriptor("local", 99, true), MockProvider::new("local")),
        ]);

        let health = orch.health_status().await;
        assert_eq!(health.len(), 2);
        assert!(health["a"]);
        assert!(health["local"]);
    }

    #[tokio::test]
    async fn test_shutdown_resets_state() {
        let mock = MockProvider::new("mock-a");
        let orch = build(vec![(descriptor("mock-a", 1, false), mock.clone())]);

        let _ = orch.submit(request("안녕!"), Priority::Normal).await.unwrap();
        orch.shutdown();

        // 캐시가 비워졌으므로 같은 요청이 다시 provider로 감
        let _ = orch.submit(request("안녕!"), Priority::Normal).await.unwrap();
        assert_eq!(mock.calls(), 2);
    }
}
