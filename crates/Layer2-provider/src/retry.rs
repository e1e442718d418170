//! Retry logic with exponential backoff
//!
//! 재시도 여부는 고정된 분류가 아니라 설정된 에러 코드 집합이 결정합니다.
//! "재시도"는 같은 provider를 다시 부르는 것이고, provider 간 폴백은
//! 오케스트레이터의 몫입니다.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ErrorCode, ProviderError};
use maum_foundation::RetrySettings;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial delay between retries (milliseconds)
    pub base_delay_ms: u64,

    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// 재시도 대상 에러 코드
    pub retryable_codes: HashSet<ErrorCode>,

    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            retryable_codes: HashSet::from([
                ErrorCode::RateLimitExceeded,
                ErrorCode::NetworkError,
                ErrorCode::Timeout,
                ErrorCode::ServerError,
            ]),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// 설정 파일의 RetrySettings에서 변환
    pub fn from_settings(settings: &RetrySettings) -> Self {
        let mut retryable_codes = HashSet::new();
        for raw in &settings.retryable_codes {
            match ErrorCode::parse(raw) {
                Some(code) => {
                    retryable_codes.insert(code);
                }
                None => warn!("retry config: unknown error code '{}', ignored", raw),
            }
        }

        Self {
            max_retries: settings.max_retries,
            base_delay_ms: settings.base_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            backoff_multiplier: settings.backoff_multiplier,
            retryable_codes,
            jitter: false,
        }
    }

    /// 이 에러 코드로 같은 provider를 다시 시도해도 되는가
    pub fn is_retryable(&self, code: ErrorCode) -> bool {
        self.retryable_codes.contains(&code)
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);

        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let final_delay = if self.jitter {
            // 20% jitter (0.8 to 1.2)
            let jitter_factor = 0.8 + pseudo_jitter() * 0.4;
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0)
fn pseudo_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Execute an async provider operation with bounded retry.
///
/// 재시도 불가 코드는 즉시 반환합니다. RateLimited가 retry_after를
/// 들고 오면 백오프 대신 그 값을 기다립니다.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let code = e.code();

                if !config.is_retryable(code) {
                    debug!(
                        "{}: non-retryable {} on attempt {}: {}",
                        operation_name,
                        code,
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }

                if attempt >= config.max_retries {
                    warn!(
                        "{}: max retries ({}) exceeded: {}",
                        operation_name, config.max_retries, e
                    );
                    return Err(e);
                }

                let delay = match e.retry_after_ms() {
                    Some(ms) => Duration::from_millis(ms),
                    None => config.delay_for_attempt(attempt),
                };

                warn!(
                    "{}: attempt {} failed ({}), retrying in {:?}",
                    operation_name,
                    attempt + 1,
                    code,
                    delay
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
