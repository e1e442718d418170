//! Priority queue
//!
//! 세 개의 FIFO 리스트 (high / normal / low). 티어 간에는 high가 항상
//! 먼저, 티어 안에서는 제출 순서가 보존됩니다. 우선순위는 큐 순서에만
//! 영향을 주고 provider 선택과는 무관합니다.

use std::collections::VecDeque;
use std::time::Instant;

use tokio::sync::oneshot;
use uuid::Uuid;

use maum_foundation::{ChatRequest, ChatResponse, Priority, Result};

/// A queued request awaiting the drain loop
#[derive(Debug)]
pub struct QueueEntry {
    /// Correlation id assigned at submission
    pub id: Uuid,

    /// The normalized request
    pub request: ChatRequest,

    /// Queue tier
    pub priority: Priority,

    /// 제출 시각 - 큐 타임아웃 판정용
    pub enqueued_at: Instant,

    /// Completion callback (value or error)
    pub responder: oneshot::Sender<Result<ChatResponse>>,
}

impl QueueEntry {
    pub fn new(
        id: Uuid,
        request: ChatRequest,
        priority: Priority,
        responder: oneshot::Sender<Result<ChatResponse>>,
    ) -> Self {
        Self {
            id,
            request,
            priority,
            enqueued_at: Instant::now(),
            responder,
        }
    }
}

/// Three-tier FIFO queue
#[derive(Debug, Default)]
pub struct RequestQueue {
    high: VecDeque<QueueEntry>,
    normal: VecDeque<QueueEntry>,
    low: VecDeque<QueueEntry>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the matching tier list
    pub fn enqueue(&mut self, entry: QueueEntry) {
        match entry.priority {
            Priority::High => self.high.push_back(entry),
            Priority::Normal => self.normal.push_back(entry),
            Priority::Low => self.low.push_back(entry),
        }
    }

    /// Pop the next entry: high → normal → low
    pub fn dequeue(&mut self) -> Option<QueueEntry> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }

    /// 티어별 대기 수 (high, normal, low)
    pub fn tier_counts(&self) -> (usize, usize, usize) {
        (self.high.len(), self.normal.len(), self.low.len())
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 모든 대기 엔트리를 꺼냄 - 콜백 거부는 호출자 책임
    pub fn clear(&mut self) -> Vec<QueueEntry> {
        let mut drained = Vec::with_capacity(self.len());
        drained.extend(self.high.drain(..));
        drained.extend(self.normal.drain(..));
        drained.extend(self.low.drain(..));
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maum_foundation::{ChatTurn, CompanionContext};

    fn entry(message: &str, priority: Priority) -> (QueueEntry, oneshot::Receiver<Result<ChatResponse>>) {
        let (tx, rx) = oneshot::channel();
        let ctx = CompanionContext::new("c-1", "하루");
        let request = ChatRequest::new(vec![ChatTurn::user(message)], ctx);
        (QueueEntry::new(Uuid::new_v4(), request, priority, tx), rx)
    }

    fn message_of(entry: &QueueEntry) -> &str {
        &entry.request.turns[0].content
    }

    #[test]
    fn test_tier_order_with_fifo_within_tier() {
        let mut queue = RequestQueue::new();

        // 제출 순서: low, high, normal, high
        for (msg, priority) in [
            ("low-1", Priority::Low),
            ("high-1", Priority::High),
            ("normal-1", Priority::Normal),
            ("high-2", Priority::High),
        ] {
            let (entry, _rx) = entry(msg, priority);
            queue.enqueue(entry);
        }

        // 드레인 순서: high, high, normal, low (티어 내 FIFO)
        let order: Vec<String> = std::iter::from_fn(|| queue.dequeue())
            .map(|e| message_of(&e).to_string())
            .collect();

        assert_eq!(order, vec!["high-1", "high-2", "normal-1", "low-1"]);
    }

    #[test]
    fn test_counts() {
        let mut queue = RequestQueue::new();
        let (a, _rx_a) = entry("a", Priority::High);
        let (b, _rx_b) = entry("b", Priority::Low);
        queue.enqueue(a);
        queue.enqueue(b);

        assert_eq!(queue.tier_counts(), (1, 0, 1));
        assert_eq!(queue.len(), 2);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_clear_drains_everything() {
        let mut queue = RequestQueue::new();
        let (a, _rx_a) = entry("a", Priority::High);
        let (b, _rx_b) = entry("b", Priority::Normal);
        queue.enqueue(a);
        queue.enqueue(b);

        let drained = queue.clear();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_dequeue() {
        let mut queue = RequestQueue::new();
        assert!(queue.dequeue().is_none());
    }
}
