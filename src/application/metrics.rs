use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::{AppError, ErrorKind};

/// Request and outcome counters. Shared through `Arc` by every handle of the
/// service; all updates are single atomic increments.
#[derive(Debug, Default)]
pub struct Metrics {
    total_requests: AtomicU64,
    error_requests: AtomicU64,
    rejected: AtomicU64,
    conflicts: AtomicU64,
    internal_errors: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub error_requests: u64,
    pub rejected: u64,
    pub conflicts: u64,
    pub internal_errors: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request and its outcome.
    pub fn record<T>(&self, result: &Result<T, AppError>) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let Err(err) = result else {
            return;
        };
        self.error_requests.fetch_add(1, Ordering::Relaxed);
        match err.kind() {
            ErrorKind::InsufficientBalance => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
            }
            ErrorKind::Conflict => {
                self.conflicts.fetch_add(1, Ordering::Relaxed);
            }
            ErrorKind::Internal => {
                self.internal_errors.fetch_add(1, Ordering::Relaxed);
            }
            ErrorKind::Validation | ErrorKind::NotFound => {}
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            error_requests: self.error_requests.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}
