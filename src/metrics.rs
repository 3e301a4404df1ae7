use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one batch run. Shared between the generator, runner, and
/// orchestrator; safe to read from any task.
#[derive(Debug)]
pub struct RunMetrics {
    pub items_generated: AtomicU64,
    pub items_completed: AtomicU64,
    pub items_failed: AtomicU64,
    pub stage_calls: AtomicU64,
    pub generation_requests: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            items_generated: AtomicU64::new(0),
            items_completed: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
            stage_calls: AtomicU64::new(0),
            generation_requests: AtomicU64::new(0),
        })
    }

    pub fn record_generated(&self, count: usize) {
        self.items_generated
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_generation_request(&self) {
        self.generation_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stage_call(&self) {
        self.stage_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item(&self, completed: bool) {
        if completed {
            self.items_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.items_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_generated: self.items_generated.load(Ordering::Relaxed),
            items_completed: self.items_completed.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            stage_calls: self.stage_calls.load(Ordering::Relaxed),
            generation_requests: self.generation_requests.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub items_generated: u64,
    pub items_completed: u64,
    pub items_failed: u64,
    pub stage_calls: u64,
    pub generation_requests: u64,
}
