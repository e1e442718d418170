//! Provider-specific error types
//!
//! ProviderError는 백엔드 호출 관련 세부 에러를 관리합니다.
//! maum_foundation::Error와의 변환을 지원합니다.
//!
//! 두 축이 분리되어 있다는 점이 중요합니다:
//! - retryable: 같은 provider를 다시 시도할 가치가 있는가 (설정된 코드 집합이 결정)
//! - recoverable: 다른 provider로 넘어갈 가치가 있는가 (에러 자체가 결정)

use maum_foundation::Error as FoundationError;
use thiserror::Error;

/// 안정적인 에러 코드 - 설정 파일의 retryable_codes와 대조되는 값
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidRequest,
    InvalidCredentials,
    AccessForbidden,
    RateLimitExceeded,
    DailyLimitExceeded,
    NetworkError,
    Timeout,
    ServerError,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccessForbidden => "ACCESS_FORBIDDEN",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ServerError => "SERVER_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// 설정 문자열 → 코드 (알 수 없는 문자열은 None)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INVALID_REQUEST" => Some(Self::InvalidRequest),
            "INVALID_CREDENTIALS" => Some(Self::InvalidCredentials),
            "ACCESS_FORBIDDEN" => Some(Self::AccessForbidden),
            "RATE_LIMIT_EXCEEDED" => Some(Self::RateLimitExceeded),
            "DAILY_LIMIT_EXCEEDED" => Some(Self::DailyLimitExceeded),
            "NETWORK_ERROR" => Some(Self::NetworkError),
            "TIMEOUT" => Some(Self::Timeout),
            "SERVER_ERROR" => Some(Self::ServerError),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// 요청 자체가 잘못됨 - 어느 provider로 가도 같은 결과
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// API key is missing or invalid
    #[error("Authentication failed: {0}")]
    InvalidCredentials(String),

    /// 접근 권한 없음 (403)
    #[error("Access forbidden: {0}")]
    AccessForbidden(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// 일일 토큰 예산 소진
    #[error("Daily token budget exhausted: {0}")]
    DailyLimitExceeded(String),

    /// Network error (connection failed, DNS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Call timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {0}")]
    Server(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// 안정적인 에러 코드
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::InvalidCredentials(_) => ErrorCode::InvalidCredentials,
            Self::AccessForbidden(_) => ErrorCode::AccessForbidden,
            Self::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            Self::DailyLimitExceeded(_) => ErrorCode::DailyLimitExceeded,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Server(_) => ErrorCode::ServerError,
            Self::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// 다른 provider를 시도할 가치가 있는가.
    ///
    /// 잘못된 요청은 어느 백엔드로 가도 똑같이 실패하므로 체인 전체를
    /// 중단합니다. 자격 증명/권한/한도는 provider마다 다르므로 복구 가능.
    pub fn recoverable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }

    /// Provider가 지정한 재시도 대기 시간
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }

    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 => Self::InvalidCredentials(truncate_body(body)),
            403 => Self::AccessForbidden(truncate_body(body)),
            429 => Self::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 => Self::InvalidRequest(truncate_body(body)),
            404 => Self::InvalidRequest(format!("unknown endpoint or model: {}", truncate_body(body))),
            500..=599 => Self::Server(truncate_body(body)),
            _ => Self::Unknown(format!("HTTP {}: {}", status, truncate_body(body))),
        }
    }
}

/// 에러 바디는 로그에 다 싣기엔 길 수 있음
fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

/// Try to extract retry-after value from error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    // JSON 바디에서 retry_after 찾기
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(secs) = json
            .get("error")
            .and_then(|e| e.get("retry_after"))
            .and_then(|v| v.as_f64())
        {
            return Some((secs * 1000.0) as u64);
        }
    }

    // 평문에서 숫자 찾기
    if let Some(idx) = body.find("retry") {
        let after = &body[idx..];
        let num_str: String = after
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        if let Ok(secs) = num_str.parse::<f64>() {
            return Some((secs * 1000.0) as u64);
        }
    }

    None
}

// ============================================================================
// maum_foundation::Error 변환
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidRequest(msg) => FoundationError::InvalidInput(msg),
            ProviderError::InvalidCredentials(msg) => FoundationError::Api {
                provider: "unknown".to_string(),
                message: format!("Authentication failed: {}", msg),
            },
            ProviderError::AccessForbidden(msg) => FoundationError::Api {
                provider: "unknown".to_string(),
                message: format!("Access forbidden: {}", msg),
            },
            ProviderError::RateLimited { retry_after_ms } => FoundationError::RateLimited(
                retry_after_ms
                    .map(|ms| format!("retry after {}ms", ms))
                    .unwrap_or_else(|| "rate limited".to_string()),
            ),
            ProviderError::DailyLimitExceeded(msg) => FoundationError::DailyLimitExceeded(msg),
            ProviderError::Network(msg) => FoundationError::Http(msg),
            ProviderError::Timeout(msg) => FoundationError::Timeout(msg),
            ProviderError::Server(msg) => FoundationError::Provider(format!("server error: {}", msg)),
            ProviderError::Unknown(msg) => FoundationError::Provider(msg),
        }
    }
}
