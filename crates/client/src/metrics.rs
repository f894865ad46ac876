//! Per-operation request metrics.
//!
//! Every round trip made by a [`ServiceClient`](crate::ServiceClient) is
//! recorded here: a success/failure count and a latency histogram per
//! [`Operation`]. One collector is shared by all clients of an endpoint.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Highest latency tracked by the histograms (one hour, in microseconds).
const MAX_LATENCY_US: u64 = 3_600_000_000;

/// Remote operations issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Authenticate,
    VerifyToken,
    Register,
    CurrentIdentity,
    ListUsers,
    ListContent,
    CreateContent,
    Vote,
    DeleteContent,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Authenticate => "authenticate",
            Operation::VerifyToken => "verify_token",
            Operation::Register => "register",
            Operation::CurrentIdentity => "current_identity",
            Operation::ListUsers => "list_users",
            Operation::ListContent => "list_content",
            Operation::CreateContent => "create_content",
            Operation::Vote => "vote",
            Operation::DeleteContent => "delete_content",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct OperationStats {
    succeeded: u64,
    failed: u64,
    latency_us: Histogram<u64>,
}

impl OperationStats {
    fn new() -> Self {
        Self {
            succeeded: 0,
            failed: 0,
            latency_us: Histogram::new_with_bounds(1, MAX_LATENCY_US, 3)
                .expect("static histogram bounds are valid"),
        }
    }
}

/// Summary of one operation's requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSummary {
    pub operation: Operation,
    pub succeeded: u64,
    pub failed: u64,
    pub p50: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl OperationSummary {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Thread-safe request metrics collector.
#[derive(Default)]
pub struct RequestMetrics {
    stats: Mutex<BTreeMap<Operation, OperationStats>>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed round trip.
    pub fn record(&self, operation: Operation, latency: Duration, success: bool) {
        let mut stats = self.stats.lock();
        let entry = stats.entry(operation).or_insert_with(OperationStats::new);
        if success {
            entry.succeeded += 1;
        } else {
            entry.failed += 1;
        }
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        entry.latency_us.saturating_record(micros.max(1));
    }

    /// Total round trips recorded for all operations.
    pub fn total_requests(&self) -> u64 {
        self.stats
            .lock()
            .values()
            .map(|s| s.succeeded + s.failed)
            .sum()
    }

    /// Summaries ordered by operation.
    pub fn snapshot(&self) -> Vec<OperationSummary> {
        self.stats
            .lock()
            .iter()
            .map(|(operation, stats)| OperationSummary {
                operation: *operation,
                succeeded: stats.succeeded,
                failed: stats.failed,
                p50: Duration::from_micros(stats.latency_us.value_at_quantile(0.5)),
                p99: Duration::from_micros(stats.latency_us.value_at_quantile(0.99)),
                max: Duration::from_micros(stats.latency_us.max()),
            })
            .collect()
    }
}

impl fmt::Debug for RequestMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestMetrics")
            .field("total_requests", &self.total_requests())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_outcomes() {
        let metrics = RequestMetrics::new();
        metrics.record(Operation::Vote, Duration::from_millis(5), true);
        metrics.record(Operation::Vote, Duration::from_millis(7), false);
        metrics.record(Operation::Register, Duration::from_millis(1), true);

        assert_eq!(metrics.total_requests(), 3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.len(), 2);
        // BTreeMap order follows the enum declaration
        assert_eq!(snapshot[0].operation, Operation::Register);
        let vote = &snapshot[1];
        assert_eq!(vote.succeeded, 1);
        assert_eq!(vote.failed, 1);
        assert_eq!(vote.total(), 2);
        assert!(vote.max >= Duration::from_millis(7));
        assert!(vote.p50 <= vote.p99);
    }

    #[test]
    fn test_empty_snapshot() {
        let metrics = RequestMetrics::new();
        assert!(metrics.snapshot().is_empty());
        assert_eq!(metrics.total_requests(), 0);
    }
}
