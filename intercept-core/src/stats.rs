use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Interceptor counters
#[derive(Debug, Default)]
pub struct InterceptorStats {
    pub submitted: AtomicU64,
    pub held: AtomicU64,
    pub released_by_sweep: AtomicU64,
    pub handled: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub held: u64,
    pub released_by_sweep: u64,
    pub handled: u64,
    pub queued: u64,
}

impl InterceptorStats {
    pub fn snapshot(&self, queued: usize) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            held: self.held.load(Ordering::Relaxed),
            released_by_sweep: self.released_by_sweep.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            queued: queued as u64,
        }
    }
}
