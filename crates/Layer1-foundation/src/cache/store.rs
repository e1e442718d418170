//! Response Cache
//!
//! 동일한 요청 지문에 대한 응답을 TTL 기반으로 보관하여 중복 비용을
//! 줄입니다. 신뢰도가 낮거나 degraded로 합성된 응답은 저장하지 않습니다.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::config::CacheConfig;
use crate::core::{ChatResponse, FinishReason};

/// A cached response entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached response snapshot
    pub response: ChatResponse,

    /// When the entry was created
    pub created_at: Instant,

    /// Visibility deadline - 이후에는 miss로 취급
    pub expires_at: Instant,

    /// How many times this entry has been served
    pub hit_count: u32,

    /// Last time this entry was served (eviction scoring)
    last_access: Instant,
}

impl CacheEntry {
    fn score(&self, now: Instant) -> f64 {
        // LFU를 최근성으로 가중: 자주 그리고 최근에 쓰인 엔트리가 살아남음
        let idle_secs = now.duration_since(self.last_access).as_secs_f64();
        (self.hit_count as f64 + 1.0) / (idle_secs + 1.0)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
}

/// TTL + scored-eviction response cache
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: HashMap<u64, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::with_capacity(config.max_entries),
            config,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up a response by fingerprint.
    ///
    /// 만료된 엔트리는 이 시점에 제거됩니다 (lazy eviction).
    pub fn get(&mut self, key: u64) -> Option<ChatResponse> {
        let now = Instant::now();

        let expired = match self.entries.get_mut(&key) {
            Some(entry) if now < entry.expires_at => {
                entry.hit_count += 1;
                entry.last_access = now;
                self.hits += 1;
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(&key);
        }
        self.misses += 1;
        None
    }

    /// Store a response under a fingerprint.
    ///
    /// Returns false (no-op) when the response is below the confidence
    /// floor or is a degraded synthesis.
    pub fn put(&mut self, key: u64, response: ChatResponse, ttl: Option<Duration>) -> bool {
        if response.confidence < self.config.min_confidence_to_cache {
            tracing::debug!(
                confidence = response.confidence,
                "cache: skipping low-confidence response"
            );
            return false;
        }
        if response.meta.finish_reason == FinishReason::Degraded {
            return false;
        }

        let now = Instant::now();
        let ttl = ttl.unwrap_or(Duration::from_millis(self.config.default_ttl_ms));

        // 기존 키 덮어쓰기는 용량을 늘리지 않으므로 eviction 불필요
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.sweep();
            while self.entries.len() >= self.config.max_entries {
                if !self.evict_lowest(now) {
                    break;
                }
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                response,
                created_at: now,
                expires_at: now + ttl,
                hit_count: 0,
                last_access: now,
            },
        );
        true
    }

    /// 점수가 가장 낮은 엔트리 하나 제거
    fn evict_lowest(&mut self, now: Instant) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.score(now)
                    .partial_cmp(&b.score(now))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(key, _)| *key);

        match victim {
            Some(key) => {
                self.entries.remove(&key);
                self.evictions += 1;
                true
            }
            None => false,
        }
    }

    /// Remove expired entries regardless of access pattern.
    ///
    /// Returns the number of removed entries.
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before - self.entries.len()
    }

    /// Drop everything (shutdown path)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            entries: self.entries.len(),
            capacity: self.config.max_entries,
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            evictions: self.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResponseMeta;

    fn response(confidence: f32) -> ChatResponse {
        let mut resp = ChatResponse::new("응답이에요", "mock");
        resp.confidence = confidence;
        resp
    }

    fn cache() -> ResponseCache {
        ResponseCache::new(CacheConfig {
            max_entries: 3,
            default_ttl_ms: 10_000,
            min_confidence_to_cache: 0.6,
            sweep_interval_ms: 1000,
        })
    }

    #[test]
    fn test_round_trip() {
        let mut cache = cache();

        assert!(cache.get(1).is_none());
        assert!(cache.put(1, response(0.9), None));

        let hit = cache.get(1).unwrap();
        assert_eq!(hit.content, "응답이에요");
    }

    #[test]
    fn test_ttl_expiry_then_overwrite() {
        let mut cache = cache();
        cache.put(1, response(0.9), Some(Duration::from_millis(20)));

        std::thread::sleep(Duration::from_millis(30));

        // 만료 후에는 miss
        assert!(cache.get(1).is_none());

        // 그리고 다시 쓸 수 있음
        assert!(cache.put(1, response(0.8), None));
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn test_confidence_floor() {
        let mut cache = cache();
        assert!(!cache.put(1, response(0.2), None));
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn test_degraded_never_stored() {
        let mut cache = cache();
        let mut resp = response(0.9);
        resp.meta = ResponseMeta {
            finish_reason: FinishReason::Degraded,
            ..ResponseMeta::default()
        };

        assert!(!cache.put(1, resp, None));
    }

    #[test]
    fn test_eviction_prefers_cold_entries() {
        let mut cache = cache();
        cache.put(1, response(0.9), None);
        cache.put(2, response(0.9), None);
        cache.put(3, response(0.9), None);

        // 1번을 자주 사용해서 점수를 올림
        cache.get(1);
        cache.get(1);
        cache.get(1);

        // 용량 초과 → 점수가 낮은 엔트리(2 또는 3)가 밀려남
        cache.put(4, response(0.9), None);

        assert!(cache.get(1).is_some());
        assert!(cache.get(4).is_some());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_sweep_removes_expired() {
        let mut cache = cache();
        cache.put(1, response(0.9), Some(Duration::from_millis(10)));
        cache.put(2, response(0.9), None);

        std::thread::sleep(Duration::from_millis(20));

        let removed = cache.sweep();
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stats() {
        let mut cache = cache();
        cache.get(1); // miss
        cache.put(1, response(0.9), None);
        cache.get(1); // hit
        cache.get(1); // hit

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.666).abs() < 0.01);
    }
}
