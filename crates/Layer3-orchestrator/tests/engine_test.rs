//! 엔진 통합 테스트 - 설정에서 구성한 엔진의 전 구간 검증
//!
//! `cargo test -p maum-orchestrator --test engine_test`
//!
//! 네트워크 vendor 없이 로컬 폴백만 활성화한 설정을 사용하므로
//! 외부 의존성 없이 전체 파이프라인(정규화 → 캐시 → 선택 → 실행 →
//! 통계)을 통과합니다.

use std::collections::BTreeMap;

use maum_foundation::{
    ChatRequest, ChatTurn, CompanionContext, EngineConfig, Error, Priority, ProviderConfig,
    ProviderSettings,
};
use maum_orchestrator::Orchestrator;

fn local_only_config() -> EngineConfig {
    let mut providers = BTreeMap::new();
    providers.insert("local".to_string(), ProviderSettings::local());

    EngineConfig {
        providers: ProviderConfig {
            providers,
            default: Some("local".to_string()),
        },
        ..EngineConfig::default()
    }
}

fn request(message: &str) -> ChatRequest {
    let mut context = CompanionContext::new("companion-1", "하루");
    context.relationship = 0.8;
    context.personality.warmth = 0.9;
    ChatRequest::new(vec![ChatTurn::user(message)], context)
}

#[tokio::test]
async fn test_submit_end_to_end_with_cache() {
    let orchestrator = Orchestrator::from_config(&local_only_config()).expect("engine builds");

    let first = orchestrator
        .submit(request("오늘 뭐 했어?"), Priority::Normal)
        .await
        .expect("submit succeeds");

    assert_eq!(first.provider, "local");
    assert!(!first.content.is_empty());
    assert!(!first.cached);
    assert!(first.confidence > 0.0);

    // 같은 요청은 TTL 안에서 캐시로
    let second = orchestrator
        .submit(request("오늘 뭐 했어?"), Priority::Normal)
        .await
        .expect("submit succeeds");

    assert!(second.cached);
    assert_eq!(second.content, first.content);

    let stats = orchestrator.usage_stats();
    assert_eq!(stats.total_requests, 2);
    assert!(stats.cache_hit_rate > 0.0);
    assert!(stats.error_rate < f64::EPSILON);

    orchestrator.shutdown();
}

#[tokio::test]
async fn test_health_and_queue_surface() {
    let orchestrator = Orchestrator::from_config(&local_only_config()).expect("engine builds");

    let health = orchestrator.health_status().await;
    assert_eq!(health.get("local"), Some(&true));

    let status = orchestrator.queue_status();
    assert_eq!(status.total, 0);
    assert!(!status.is_processing);

    orchestrator.shutdown();
}

#[tokio::test]
async fn test_disabled_providers_are_not_registered() {
    let mut config = local_only_config();
    let mut anthropic = ProviderSettings::anthropic();
    anthropic.enabled = false;
    config
        .providers
        .providers
        .insert("anthropic".to_string(), anthropic);

    let orchestrator = Orchestrator::from_config(&config).expect("engine builds");

    // 비활성화된 provider는 health에도 나타나지 않음
    let health = orchestrator.health_status().await;
    assert_eq!(health.len(), 1);
    assert!(health.contains_key("local"));

    orchestrator.shutdown();
}

#[tokio::test]
async fn test_empty_config_is_an_error() {
    let config = EngineConfig {
        providers: ProviderConfig {
            providers: BTreeMap::new(),
            default: None,
        },
        ..EngineConfig::default()
    };

    match Orchestrator::from_config(&config) {
        Err(Error::Config(_)) => {}
        other => panic!("expected config error, got {:?}", other.map(|_| "engine")),
    }
}
