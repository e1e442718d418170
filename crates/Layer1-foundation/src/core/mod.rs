//! Core types shared by every layer

mod types;

pub use types::{
    ChatRequest, ChatResponse, ChatTurn, CompanionContext, EmotionTag, FinishReason,
    GenerationOptions, PersonalityVector, Priority, ResponseMeta, TokenUsage, TurnRole,
};
