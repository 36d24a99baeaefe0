//! Concurrent assertion counters.

use super::{AssertionEvent, AssertionObserver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Pass/fail counts for one assertion name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameTally {
    pub passed: u64,
    pub failed: u64,
}

/// Point-in-time copy of [`AssertionStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub by_name: HashMap<String, NameTally>,
}

/// Observer counting evaluations; safe to share across worker threads.
#[derive(Debug, Default)]
pub struct AssertionStatistics {
    total: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
    by_name: Mutex<HashMap<String, NameTally>>,
}

impl AssertionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn passed(&self) -> u64 {
        self.passed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total: self.total(),
            passed: self.passed(),
            failed: self.failed(),
            by_name: self
                .by_name
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

impl AssertionObserver for AssertionStatistics {
    fn on_assertion(&self, event: &AssertionEvent) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if event.passed {
            self.passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(name) = &event.assertion_name {
            let mut by_name = self.by_name.lock().unwrap_or_else(PoisonError::into_inner);
            let tally = by_name.entry(name.clone()).or_default();
            if event.passed {
                tally.passed += 1;
            } else {
                tally.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;
    use std::sync::Arc;

    #[test]
    fn test_counts_under_concurrency() {
        let stats = Arc::new(AssertionStatistics::new());
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let event = if i % 2 == 0 {
                            AssertionEvent::passed(Some("even".to_string()), None)
                        } else {
                            AssertionEvent::failed(
                                Failure::new("odd", "", "").with_assertion_name("odd"),
                            )
                        };
                        stats.on_assertion(&event);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 800);
        assert_eq!(snapshot.passed, 400);
        assert_eq!(snapshot.failed, 400);
        assert_eq!(
            snapshot.by_name.get("odd"),
            Some(&NameTally {
                passed: 0,
                failed: 400
            })
        );
    }
}
