//! Rate limiting (admission control)
//!
//! Provider별 이중 슬라이딩 윈도우: 60초 요청/토큰 윈도우와 24시간 토큰
//! 예산. 검사와 예약은 한 번의 &mut 호출 안에서 끝나므로 check-then-act
//! 경쟁이 없습니다 (호출자는 오케스트레이터의 단일 처리 경로).

use std::time::{Duration, Instant};

use crate::registry::ProviderDescriptor;

/// 분당/일일 한도
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u64,
    pub daily_token_limit: u64,
}

impl RateLimits {
    pub fn from_descriptor(descriptor: &ProviderDescriptor) -> Self {
        Self {
            requests_per_minute: descriptor.requests_per_minute,
            tokens_per_minute: descriptor.tokens_per_minute,
            daily_token_limit: descriptor.daily_token_limit,
        }
    }
}

/// 현재 윈도우 사용량 스냅샷
#[derive(Debug, Clone, Copy, Default)]
pub struct RateUsage {
    pub requests_in_window: u32,
    pub tokens_in_window: u64,
    pub daily_tokens_used: u64,
}

/// Per-provider sliding-window admission control
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    minute_window: Duration,
    day_window: Duration,

    requests_in_window: u32,
    tokens_in_window: u64,
    window_start: Instant,

    daily_tokens_used: u64,
    day_start: Instant,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self::with_windows(limits, Duration::from_secs(60), Duration::from_secs(24 * 3600))
    }

    /// 윈도우 길이 지정 (테스트용 축소 윈도우 포함)
    pub fn with_windows(limits: RateLimits, minute_window: Duration, day_window: Duration) -> Self {
        let now = Instant::now();
        Self {
            limits,
            minute_window,
            day_window,
            requests_in_window: 0,
            tokens_in_window: 0,
            window_start: now,
            daily_tokens_used: 0,
            day_start: now,
        }
    }

    /// 윈도우 경계에서 카운터 리셋
    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.window_start) >= self.minute_window {
            self.requests_in_window = 0;
            self.tokens_in_window = 0;
            self.window_start = now;
        }
        if now.duration_since(self.day_start) >= self.day_window {
            self.daily_tokens_used = 0;
            self.day_start = now;
        }
    }

    /// 호출 하나를 허용할지 결정하고, 허용하면 그 자리에서 용량을 예약.
    pub fn can_admit(&mut self, estimated_tokens: u64) -> bool {
        let now = Instant::now();
        self.roll(now);

        if self.requests_in_window >= self.limits.requests_per_minute {
            return false;
        }
        if self.tokens_in_window.saturating_add(estimated_tokens) > self.limits.tokens_per_minute {
            return false;
        }
        if self.daily_tokens_used.saturating_add(estimated_tokens) > self.limits.daily_token_limit {
            return false;
        }

        self.requests_in_window += 1;
        self.tokens_in_window = self.tokens_in_window.saturating_add(estimated_tokens);
        self.daily_tokens_used = self.daily_tokens_used.saturating_add(estimated_tokens);
        true
    }

    /// 거부된 호출을 언제 다시 시도할 수 있는가.
    ///
    /// 일일 예산이 소진되었으면 None (이번 사이클에는 재시도 불가),
    /// 아니면 분 윈도우가 리셋될 때까지 남은 시간.
    pub fn retry_delay(&self) -> Option<Duration> {
        if self.daily_tokens_used >= self.limits.daily_token_limit {
            return None;
        }
        Some(
            self.minute_window
                .saturating_sub(self.window_start.elapsed()),
        )
    }

    pub fn usage(&self) -> RateUsage {
        RateUsage {
            requests_in_window: self.requests_in_window,
            tokens_in_window: self.tokens_in_window,
            daily_tokens_used: self.daily_tokens_used,
        }
    }

    /// 모든 카운터 리셋 (shutdown 경로)
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.requests_in_window = 0;
        self.tokens_in_window = 0;
        self.window_start = now;
        self.daily_tokens_used = 0;
        self.day_start = now;
    }
}
