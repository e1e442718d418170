//! 요청 지문(fingerprint) 계산
//!
//! 캐시 키는 요청의 "응답을 바꿀 수 있는 부분"만으로 결정되어야 합니다:
//! 최근 턴들, 컴패니언 식별자, 양자화된 감정/친밀도 버킷, 장면, 생성 옵션.
//! 미세하게 흔들리는 스칼라 값(감정 0.48 vs 0.52)은 버킷으로 눌러서
//! 캐시 적중률을 지킵니다.

use crate::core::ChatRequest;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// 지문에 포함되는 대화 꼬리 턴 수
const TAIL_TURNS: usize = 4;

/// Compute a hash for any hashable value
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// 여러 구성요소를 쌓아 하나의 지문을 만드는 빌더
#[derive(Debug, Default)]
pub struct FingerprintBuilder {
    components: Vec<u64>,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn push<T: Hash>(&mut self, value: &T) -> &mut Self {
        self.components.push(compute_hash(value));
        self
    }

    pub fn push_str(&mut self, s: &str) -> &mut Self {
        self.components.push(compute_hash(&s));
        self
    }

    /// Build a single hash from all components
    pub fn finish(&self) -> u64 {
        compute_hash(&self.components)
    }
}

/// 정규화된 요청의 캐시 지문 계산
pub fn request_fingerprint(request: &ChatRequest) -> u64 {
    let mut builder = FingerprintBuilder::new();

    // 대화 꼬리: 최근 턴들만 (앞쪽 히스토리는 프루닝으로 변동이 잦음)
    let tail_start = request.turns.len().saturating_sub(TAIL_TURNS);
    for turn in &request.turns[tail_start..] {
        builder.push(&(turn.role as u8));
        builder.push_str(&turn.content);
    }

    // 컨텍스트 중 응답에 유의미한 필드만
    let ctx = &request.context;
    builder.push_str(&ctx.companion_id);
    builder.push(&ctx.relationship_tier());
    builder.push(&ctx.mood_bucket());
    for (key, value) in &ctx.scene {
        builder.push_str(key);
        builder.push_str(value);
    }

    // 생성 옵션 (f32는 비트 패턴으로)
    builder.push(&request.options.max_tokens);
    builder.push(&request.options.temperature.map(f32::to_bits));

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChatTurn, CompanionContext};

    fn request(message: &str) -> ChatRequest {
        let ctx = CompanionContext::new("c-1", "하루");
        ChatRequest::new(vec![ChatTurn::user(message)], ctx)
    }

    #[test]
    fn test_same_request_same_fingerprint() {
        assert_eq!(
            request_fingerprint(&request("안녕!")),
            request_fingerprint(&request("안녕!"))
        );
    }

    #[test]
    fn test_different_message_different_fingerprint() {
        assert_ne!(
            request_fingerprint(&request("안녕!")),
            request_fingerprint(&request("잘 잤어?"))
        );
    }

    #[test]
    fn test_mood_jitter_keeps_fingerprint() {
        let mut a = request("안녕!");
        let mut b = request("안녕!");
        a.context.mood = 0.49;
        b.context.mood = 0.51;

        // 버킷이 같으므로 지문도 같아야 함
        assert_eq!(request_fingerprint(&a), request_fingerprint(&b));
    }

    #[test]
    fn test_companion_identity_changes_fingerprint() {
        let a = request("안녕!");
        let mut b = request("안녕!");
        b.context.companion_id = "c-2".to_string();

        assert_ne!(request_fingerprint(&a), request_fingerprint(&b));
    }

    #[test]
    fn test_only_tail_turns_matter() {
        let ctx = CompanionContext::new("c-1", "하루");
        let mut long_a = vec![ChatTurn::user("old-a")];
        let mut long_b = vec![ChatTurn::user("old-b")];
        for i in 0..TAIL_TURNS {
            long_a.push(ChatTurn::user(format!("turn-{i}")));
            long_b.push(ChatTurn::user(format!("turn-{i}")));
        }

        let a = ChatRequest::new(long_a, ctx.clone());
        let b = ChatRequest::new(long_b, ctx);

        // 꼬리 밖의 턴이 달라도 지문은 동일
        assert_eq!(request_fingerprint(&a), request_fingerprint(&b));
    }
}
