use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Outcome counters for every update that reached a portal.
#[derive(Debug, Default)]
pub struct UpdateMetrics {
    committed: AtomicU64,
    unchanged: AtomicU64,
    rejected: AtomicU64,
    parse_failures: AtomicU64,
    feed_lines: AtomicU64,
    comments_skipped: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub committed: u64,
    pub unchanged: u64,
    pub rejected: u64,
    pub parse_failures: u64,
    pub feed_lines: u64,
    pub comments_skipped: u64,
}

impl UpdateMetrics {
    pub fn record_committed(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unchanged(&self) {
        self.unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feed_line(&self) {
        self.feed_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_comment(&self) {
        self.comments_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            committed: self.committed.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            feed_lines: self.feed_lines.load(Ordering::Relaxed),
            comments_skipped: self.comments_skipped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_outcomes() {
        let metrics = UpdateMetrics::default();
        metrics.record_committed();
        metrics.record_committed();
        metrics.record_rejected();
        metrics.record_comment();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                committed: 2,
                rejected: 1,
                comments_skipped: 1,
                ..Default::default()
            }
        );
    }
}
