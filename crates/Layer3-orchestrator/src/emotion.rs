//! Emotion tagging glue
//!
//! 응답 텍스트에서 감정 태그와 신뢰도를 끌어내는 단순 휴리스틱.
//! 키워드 매칭 수준의 도메인 글루이며, 엔진 입장에서는 "태그와 [0,1]
//! 신뢰도를 내놓는 무언가"이기만 하면 됩니다.

use maum_foundation::{EmotionTag, FinishReason};
use maum_provider::ProviderReply;

/// 우선순위 순서대로 검사되는 키워드 테이블 (한국어 + 영어)
const KEYWORDS: &[(EmotionTag, &[&str])] = &[
    (
        EmotionTag::Affection,
        &["사랑", "보고 싶", "좋아해", "고마워", "소중", "love", "miss you"],
    ),
    (
        EmotionTag::Joy,
        &["기뻐", "신나", "행복", "즐거", "최고", "happy", "glad", "great"],
    ),
    (
        EmotionTag::Sadness,
        &["슬퍼", "슬프", "우울", "눈물", "외로", "sad", "lonely"],
    ),
    (
        EmotionTag::Anger,
        &["화나", "화가", "짜증", "열받", "angry", "annoyed"],
    ),
    (
        EmotionTag::Fear,
        &["무서", "불안", "걱정", "겁나", "scared", "worried", "afraid"],
    ),
    (
        EmotionTag::Surprise,
        &["깜짝", "놀랐", "놀라", "대박", "헐", "wow", "surprised"],
    ),
];

/// 응답 텍스트의 감정 태그 결정 (첫 매칭 승리, 기본 Neutral)
pub fn classify(content: &str) -> EmotionTag {
    for (tag, keywords) in KEYWORDS {
        if keywords.iter().any(|k| content.contains(k)) {
            return *tag;
        }
    }
    EmotionTag::Neutral
}

/// 응답 신뢰도 휴리스틱.
///
/// finish reason이 기본 점수를 정하고, 비정상적으로 짧은 응답은 감점.
pub fn confidence(reply: &ProviderReply) -> f32 {
    let base: f32 = match reply.finish_reason {
        FinishReason::Stop => 0.9,
        FinishReason::MaxTokens => 0.7,
        FinishReason::Other => 0.5,
        FinishReason::ContentFilter => 0.3,
        FinishReason::Degraded => 0.1,
    };

    let score = if reply.content.chars().count() < 4 {
        base * 0.5
    } else {
        base
    };

    score.clamp(0.0, 1.0)
}
