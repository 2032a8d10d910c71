//! Per-session upstream pacing.
//!
//! Each session must leave a minimum interval between upstream calls. There
//! is no queue and no fairness; a caller sleeps until the interval has
//! passed, then claims its slot.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Minimum-interval gate keyed by session id.
pub struct RateGate {
    min_interval: Duration,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl RateGate {
    /// Create a gate enforcing the given spacing between calls.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until this session may call upstream, then claim the slot.
    ///
    /// Check and claim happen under one lock acquisition, so concurrent
    /// callers for the same session serialize their claims. The lock is
    /// never held while sleeping.
    pub async fn acquire(&self, session_id: &str) {
        loop {
            let wait = {
                let mut last = self.last_request.lock().await;
                let now = Instant::now();
                match last.get(session_id) {
                    Some(&previous) => {
                        let elapsed = now.duration_since(previous);
                        if elapsed >= self.min_interval {
                            last.insert(session_id.to_string(), now);
                            return;
                        }
                        self.min_interval - elapsed
                    }
                    None => {
                        last.insert(session_id.to_string(), now);
                        return;
                    }
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Drop the session's timestamp, as if it had never called.
    pub async fn forget(&self, session_id: &str) {
        self.last_request.lock().await.remove(session_id);
    }

    /// Drop timestamps idle longer than `max_idle`. Returns how many were
    /// dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut last = self.last_request.lock().await;
        let before = last.len();
        last.retain(|_, at| at.elapsed() < max_idle);
        before - last.len()
    }

    #[cfg(test)]
    pub async fn is_known(&self, session_id: &str) -> bool {
        self.last_request.lock().await.contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const INTERVAL: Duration = Duration::from_millis(30);

    #[tokio::test]
    async fn first_acquire_is_immediate() {
        let gate = RateGate::new(INTERVAL);
        let start = Instant::now();
        gate.acquire("s1").await;
        assert!(start.elapsed() < INTERVAL);
        assert!(gate.is_known("s1").await);
    }

    #[tokio::test]
    async fn consecutive_acquires_are_spaced() {
        let gate = RateGate::new(INTERVAL);
        let start = Instant::now();
        gate.acquire("s1").await;
        gate.acquire("s1").await;
        assert!(start.elapsed() >= INTERVAL);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let gate = RateGate::new(INTERVAL);
        gate.acquire("s1").await;
        let start = Instant::now();
        gate.acquire("s2").await;
        assert!(start.elapsed() < INTERVAL);
    }

    #[tokio::test]
    async fn forget_resets_the_session() {
        let gate = RateGate::new(INTERVAL);
        gate.acquire("s1").await;
        gate.forget("s1").await;
        assert!(!gate.is_known("s1").await);

        let start = Instant::now();
        gate.acquire("s1").await;
        assert!(start.elapsed() < INTERVAL);
    }

    #[tokio::test]
    async fn concurrent_acquires_serialize_per_session() {
        let gate = Arc::new(RateGate::new(Duration::from_millis(20)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                gate.acquire("shared").await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // three claims, spaced by at least two full intervals
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn evict_idle_drops_stale_sessions() {
        let gate = RateGate::new(Duration::from_millis(1));
        gate.acquire("stale").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.acquire("fresh").await;

        let dropped = gate.evict_idle(Duration::from_millis(25)).await;
        assert_eq!(dropped, 1);
        assert!(!gate.is_known("stale").await);
        assert!(gate.is_known("fresh").await);
    }
}
