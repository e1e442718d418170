//! Local fallback provider
//!
//! 모든 네트워크 백엔드가 죽어도 대화가 끊기지 않도록 하는 마지막 후보.
//! 템플릿 기반이라 절대 실패하지 않고, 항상 healthy입니다.
//! 응답 품질은 낮지만 "응답 없음"보다는 낫다는 것이 이 컴포넌트의 존재 이유.

use async_trait::async_trait;

use crate::{
    error::ProviderError,
    r#trait::{Provider, ProviderMetadata, ProviderReply},
};
use maum_foundation::{
    cache::compute_hash, ChatRequest, CharEstimator, FinishReason, TokenEstimator, TokenUsage,
};

/// 친밀도 단계별 응답 템플릿. `{name}`은 컴패니언 이름으로 치환.
const TEMPLATES_DISTANT: &[&str] = &[
    "음… 잠깐 생각할 시간이 필요해요. 다시 한 번 말해줄래요?",
    "지금은 말이 잘 안 떠오르네요. 조금 이따 다시 이야기해요.",
    "그렇군요. 조금 더 자세히 들려줄 수 있어요?",
];

const TEMPLATES_FAMILIAR: &[&str] = &[
    "미안, 지금 머리가 좀 복잡해서… 그래도 네 얘기는 듣고 있어!",
    "음, 잠깐만. 생각 좀 정리하고 다시 말해줄게.",
    "그 얘기 더 해줘. 듣고 싶어.",
];

const TEMPLATES_CLOSE: &[&str] = &[
    "{name}이(가) 잠깐 멍해졌어… 그래도 네 옆에 있을게!",
    "지금 말문이 막혔지만, 네가 무슨 말을 하는지는 다 듣고 있어.",
    "잠깐만 기다려줄래? 금방 정신 차리고 제대로 대답할게!",
];

/// Always-available local template provider
pub struct LocalProvider {
    metadata: ProviderMetadata,
    estimator: CharEstimator,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self {
            metadata: ProviderMetadata {
                id: "local".to_string(),
                display_name: "Local Fallback".to_string(),
                model: "maum-local-template".to_string(),
                base_url: None,
            },
            estimator: CharEstimator::new(),
        }
    }

    /// 친밀도에 맞는 템플릿 테이블 선택
    fn table_for(&self, request: &ChatRequest) -> &'static [&'static str] {
        match request.context.relationship_tier() {
            0 => TEMPLATES_DISTANT,
            1 => TEMPLATES_FAMILIAR,
            _ => TEMPLATES_CLOSE,
        }
    }

    /// 같은 입력에는 같은 응답 - 해시 기반 결정적 선택
    fn pick(&self, request: &ChatRequest) -> String {
        let table = self.table_for(request);
        let seed = request
            .last_user_turn()
            .map(|t| compute_hash(&t.content))
            .unwrap_or(0);
        let line = table[(seed as usize) % table.len()];

        line.replace("{name}", &request.context.name)
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ProviderReply, ProviderError> {
        let content = self.pick(request);

        let input_tokens = self.estimator.estimate_request(request) as u32;
        let output_tokens = self.estimator.estimate(&content) as u32;

        Ok(ProviderReply {
            content,
            usage: TokenUsage::new(input_tokens, output_tokens),
            finish_reason: FinishReason::Stop,
            model: self.metadata.model.clone(),
        })
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn remaining_quota(&self) -> Option<u64> {
        // 로컬 템플릿에는 한도가 없음
        Some(u64::MAX)
    }
}
