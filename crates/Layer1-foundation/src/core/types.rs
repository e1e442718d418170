//! Core chat & companion types
//!
//! 대화 턴, 컴패니언 컨텍스트, 요청/응답 등 모든 레이어가 공유하는 타입 정의.
//! Provider 구현과 오케스트레이션 레이어는 이 타입들 위에서 동작합니다.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Chat Turn
// ============================================================================

/// Role of a turn in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Role of this turn
    pub role: TurnRole,

    /// Text content
    pub content: String,
}

impl ChatTurn {
    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Companion Context
// ============================================================================

/// 성격 벡터 - 각 축은 [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PersonalityVector {
    /// 다정함
    pub warmth: f32,
    /// 유머
    pub humor: f32,
    /// 활발함
    pub energy: f32,
    /// 공감력
    pub empathy: f32,
}

impl Default for PersonalityVector {
    fn default() -> Self {
        Self {
            warmth: 0.5,
            humor: 0.5,
            energy: 0.5,
            empathy: 0.5,
        }
    }
}

/// Everything the engine knows about the companion at request time.
///
/// 요청에 실려 오는 읽기 전용 스냅샷입니다. 영속 저장/갱신은 백엔드 담당.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionContext {
    /// 컴패니언 고유 ID
    pub companion_id: String,

    /// 표시 이름
    pub name: String,

    /// 성격 벡터
    #[serde(default)]
    pub personality: PersonalityVector,

    /// 관계 친밀도 [0, 1]
    #[serde(default)]
    pub relationship: f32,

    /// 현재 감정 상태 [0, 1] (0 = 매우 침울, 1 = 매우 좋음)
    #[serde(default = "default_mood")]
    pub mood: f32,

    /// 장면 메타데이터 (장소, 시간대 등 자유 형식 키-값)
    #[serde(default)]
    pub scene: std::collections::BTreeMap<String, String>,
}

fn default_mood() -> f32 {
    0.5
}

impl CompanionContext {
    pub fn new(companion_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            companion_id: companion_id.into(),
            name: name.into(),
            personality: PersonalityVector::default(),
            relationship: 0.0,
            mood: 0.5,
            scene: std::collections::BTreeMap::new(),
        }
    }

    /// 친밀도 단계 (0~3) - 프롬프트/캐시 키에 쓰이는 버킷
    pub fn relationship_tier(&self) -> u8 {
        match self.relationship {
            r if r >= 0.75 => 3,
            r if r >= 0.5 => 2,
            r if r >= 0.25 => 1,
            _ => 0,
        }
    }

    /// 감정 버킷 (0~4) - 미세한 변동이 캐시 키를 흔들지 않도록 양자화
    pub fn mood_bucket(&self) -> u8 {
        (self.mood.clamp(0.0, 1.0) * 4.0).round() as u8
    }
}

// ============================================================================
// Request
// ============================================================================

/// Generation options supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Max output tokens (None = provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Preferred provider name (None = registry default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// A chat-completion request.
///
/// 제출 전에는 식별자가 없습니다. 제출 시점에 correlation id와 타임스탬프가
/// 부여되며, 이후에는 시스템 컨텍스트 턴 주입 외에는 불변입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Ordered conversation turns
    pub turns: Vec<ChatTurn>,

    /// Companion context snapshot
    pub context: CompanionContext,

    /// Generation options
    #[serde(default)]
    pub options: GenerationOptions,
}

impl ChatRequest {
    pub fn new(turns: Vec<ChatTurn>, context: CompanionContext) -> Self {
        Self {
            turns,
            context,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// 시스템 턴이 포함되어 있는지 확인
    pub fn has_system_turn(&self) -> bool {
        self.turns.iter().any(|t| t.role == TurnRole::System)
    }

    /// 마지막 사용자 턴
    pub fn last_user_turn(&self) -> Option<&ChatTurn> {
        self.turns.iter().rev().find(|t| t.role == TurnRole::User)
    }
}

/// Queue priority tier. Determines drain order only, never provider choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

// ============================================================================
// Response
// ============================================================================

/// 응답에 붙는 감정 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    Joy,
    Affection,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Neutral,
}

impl Default for EmotionTag {
    fn default() -> Self {
        Self::Neutral
    }
}

/// Token usage for a single call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Reason the generation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Completed naturally
    Stop,

    /// Hit max tokens limit
    MaxTokens,

    /// Content filtered by the vendor
    ContentFilter,

    /// Synthesized fallback after a pipeline failure
    Degraded,

    /// Unknown/other
    Other,
}

impl Default for FinishReason {
    fn default() -> Self {
        Self::Other
    }
}

/// Structured response metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Finish reason
    pub finish_reason: FinishReason,

    /// Estimated cost in USD for this call
    pub cost_usd: f64,

    /// How many retries the winning call needed
    pub retry_count: u32,
}

/// A completed chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Correlation id assigned at submission
    pub id: Uuid,

    /// Text content
    pub content: String,

    /// Derived emotion tag
    pub emotion: EmotionTag,

    /// Confidence score [0, 1]
    pub confidence: f32,

    /// Token usage
    pub usage: TokenUsage,

    /// Originating provider name
    pub provider: String,

    /// Whether this response was served from cache
    pub cached: bool,

    /// Processing latency in milliseconds
    pub latency_ms: u64,

    /// Structured metadata
    pub meta: ResponseMeta,
}

impl ChatResponse {
    /// 새 응답 생성 (correlation id 자동 부여)
    pub fn new(content: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            emotion: EmotionTag::Neutral,
            confidence: 0.0,
            usage: TokenUsage::default(),
            provider: provider.into(),
            cached: false,
            latency_ms: 0,
            meta: ResponseMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        let turn = ChatTurn::user("안녕!");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "안녕!");
    }

    #[test]
    fn test_relationship_tier() {
        let mut ctx = CompanionContext::new("c-1", "하루");
        assert_eq!(ctx.relationship_tier(), 0);

        ctx.relationship = 0.3;
        assert_eq!(ctx.relationship_tier(), 1);

        ctx.relationship = 0.6;
        assert_eq!(ctx.relationship_tier(), 2);

        ctx.relationship = 0.9;
        assert_eq!(ctx.relationship_tier(), 3);
    }

    #[test]
    fn test_mood_bucket_quantizes() {
        let mut ctx = CompanionContext::new("c-1", "하루");
        ctx.mood = 0.48;
        let a = ctx.mood_bucket();
        ctx.mood = 0.52;
        let b = ctx.mood_bucket();

        // 근접한 값은 같은 버킷
        assert_eq!(a, b);
    }

    #[test]
    fn test_has_system_turn() {
        let ctx = CompanionContext::new("c-1", "하루");
        let req = ChatRequest::new(vec![ChatTurn::user("hi")], ctx.clone());
        assert!(!req.has_system_turn());

        let req = ChatRequest::new(vec![ChatTurn::system("persona"), ChatTurn::user("hi")], ctx);
        assert!(req.has_system_turn());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(120, 40);
        assert_eq!(usage.total(), 160);
    }
}
