//! Circuit breaker
//!
//! Provider별 연속 실패를 추적하는 상태 기계입니다. 죽었다고 판단되는
//! 백엔드로의 호출을 차단하고, 복구 타임아웃이 지나면 프로브 하나를
//! 통과시켜 회복 여부를 확인합니다.
//!
//! 차단기는 예외를 던지지 않고 재시도도 하지 않습니다. 호출 시도 여부만
//! 결정하며, 재시도는 별도 관심사입니다.

use std::time::{Duration, Instant};

use maum_foundation::BreakerSettings;

/// Circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy - 호출 허용
    Closed,
    /// Tripped - 복구 타임아웃까지 호출 차단
    Open,
    /// 타임아웃 경과 - 프로브 호출 하나 허용
    HalfOpen,
}

/// Per-provider circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    failure_count: u32,
    last_failure: Option<Instant>,
    state: CircuitState,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold.max(1),
            recovery_timeout: Duration::from_millis(settings.recovery_timeout_ms),
            failure_count: 0,
            last_failure: None,
            state: CircuitState::Closed,
        }
    }

    /// 이 provider로의 호출을 차단해야 하는가.
    ///
    /// Open 상태에서 복구 타임아웃이 지났으면 HalfOpen으로 전이하고
    /// false를 반환합니다 (프로브 허용).
    pub fn is_open(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);

                if elapsed >= self.recovery_timeout {
                    self.state = CircuitState::HalfOpen;
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Record a successful call - 회로를 닫고 카운터 리셋
    pub fn record_success(&mut self) {
        self.failure_count = 0;
        self.state = CircuitState::Closed;
    }

    /// Record a failed call - 임계치 도달 시 회로가 열림
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());
        if self.failure_count >= self.failure_threshold {
            self.state = CircuitState::Open;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, recovery_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerSettings {
            failure_threshold: threshold,
            recovery_timeout_ms: recovery_ms,
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let mut breaker = breaker(3, 60_000);

        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert_eq!(breaker.state(), CircuitState::Open);

        // invariant: open ⇒ failure_count ≥ threshold
        assert!(breaker.failure_count() >= 3);
    }

    #[test]
    fn test_success_resets() {
        let mut breaker = breaker(2, 60_000);

        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();

        // 연속 실패가 아니므로 닫힌 상태 유지
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 1);
    }

    #[test]
    fn test_recovery_probe() {
        let mut breaker = breaker(1, 30);

        breaker.record_failure();
        assert!(breaker.is_open());

        std::thread::sleep(Duration::from_millis(40));

        // 타임아웃 경과 → half-open 프로브 허용
        assert!(!breaker.is_open());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // 프로브 성공 → 닫힘
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_probe_failure_reopens() {
        let mut breaker = breaker(1, 30);

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        assert!(!breaker.is_open()); // half-open

        breaker.record_failure();
        assert!(breaker.is_open());
    }
}
