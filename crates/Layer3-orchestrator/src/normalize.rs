//! Request normalization
//!
//! 제출된 요청을 provider에 보내기 전에 다듬습니다:
//! - 시스템 페르소나 턴이 없으면 컨텍스트에서 만들어 맨 앞에 주입
//! - 히스토리가 토큰 예산을 넘으면 오래된 턴부터 프루닝
//!
//! 페르소나 문장 자체는 도메인 글루입니다. 엔진은 "시스템 턴이 있어야
//! 한다"는 것만 보장하고, 문구는 이 모듈에 격리되어 있습니다.

use std::sync::Arc;

use maum_foundation::{ChatRequest, ChatTurn, CompanionContext, TokenEstimator, TurnRole};

/// 프루닝 후에도 남겨두는 최소 턴 수 (시스템 턴 제외)
const MIN_KEPT_TURNS: usize = 2;

/// Normalizes requests before provider calls
pub struct RequestNormalizer {
    estimator: Arc<dyn TokenEstimator>,
    max_context_tokens: usize,
}

impl RequestNormalizer {
    pub fn new(estimator: Arc<dyn TokenEstimator>, max_context_tokens: usize) -> Self {
        Self {
            estimator,
            max_context_tokens,
        }
    }

    /// 시스템 턴 주입 + 히스토리 프루닝
    pub fn normalize(&self, request: &mut ChatRequest) {
        if !request.has_system_turn() {
            let persona = build_persona_prompt(&request.context);
            request.turns.insert(0, ChatTurn::system(persona));
        }

        self.prune(&mut request.turns);
    }

    /// 예산을 넘는 동안 가장 오래된 비시스템 턴 제거
    fn prune(&self, turns: &mut Vec<ChatTurn>) {
        while self.estimator.estimate_turns(turns) > self.max_context_tokens {
            let non_system: Vec<usize> = turns
                .iter()
                .enumerate()
                .filter(|(_, t)| t.role != TurnRole::System)
                .map(|(i, _)| i)
                .collect();

            if non_system.len() <= MIN_KEPT_TURNS {
                break;
            }
            turns.remove(non_system[0]);
        }
    }
}

/// 컴패니언 컨텍스트에서 시스템 페르소나 프롬프트 생성
pub fn build_persona_prompt(ctx: &CompanionContext) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "너는 '{}'(이)라는 이름의 AI 컴패니언이야. 사용자와 자연스러운 한국어로 대화해.",
        ctx.name
    ));

    // 성격 벡터 → 말투 지시
    let p = &ctx.personality;
    if p.warmth >= 0.7 {
        lines.push("따뜻하고 다정한 말투를 써.".to_string());
    }
    if p.humor >= 0.7 {
        lines.push("가끔 가벼운 농담을 섞어도 좋아.".to_string());
    }
    if p.energy >= 0.7 {
        lines.push("활기차고 적극적으로 반응해.".to_string());
    }
    if p.empathy >= 0.7 {
        lines.push("사용자의 감정에 먼저 공감해줘.".to_string());
    }

    lines.push(match ctx.relationship_tier() {
        0 => "아직 서로 알아가는 사이니까 예의 바르게 대해.".to_string(),
        1 => "조금 친해진 사이야. 편하게 말해도 돼.".to_string(),
        2 => "꽤 가까운 사이야. 반말로 친근하게 대화해.".to_string(),
        _ => "아주 가까운 사이야. 오래된 친구처럼 대화해.".to_string(),
    });

    if ctx.mood < 0.3 {
        lines.push("지금 기분이 가라앉아 있으니 차분하게 답해.".to_string());
    } else if ctx.mood > 0.7 {
        lines.push("지금 기분이 좋으니 밝게 답해.".to_string());
    }

    for (key, value) in &ctx.scene {
        lines.push(format!("현재 {}: {}", key, value));
    }

    lines.join(" ")
}
