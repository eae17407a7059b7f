//! Pool metrics snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a connection pool's state
///
/// Read-only and derived; taken without blocking and exported to the
/// dashboard's monitoring surface as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolMetrics {
    /// Total number of open connections (idle + active)
    total: usize,
    /// Number of idle connections parked in the pool
    idle: usize,
    /// Number of connections currently checked out
    active: usize,
    /// Number of callers waiting for a connection
    waiting: usize,
    /// Configured maximum pool size
    max_size: usize,
    /// When this snapshot was taken
    captured_at: DateTime<Utc>,
}

impl PoolMetrics {
    /// Capture a snapshot from the given counters
    pub fn capture(idle: usize, active: usize, waiting: usize, max_size: usize) -> Self {
        Self {
            total: idle + active,
            idle,
            active,
            waiting,
            max_size,
            captured_at: Utc::now(),
        }
    }

    /// All-zero snapshot reported when persistence is disabled
    pub fn disabled() -> Self {
        Self::capture(0, 0, 0, 0)
    }

    /// Get the total number of open connections
    pub fn total(&self) -> usize {
        self.total
    }

    /// Get the number of idle connections
    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Get the number of active (checked-out) connections
    pub fn active(&self) -> usize {
        self.active
    }

    /// Get the number of waiting callers
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Get the configured maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the snapshot timestamp
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Pool utilization as a ratio (0.0 to 1.0)
    ///
    /// Returns 0.0 for an empty pool to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.active as f64 / self.total as f64
        }
    }

    /// Check if every allowed connection is currently checked out
    pub fn is_saturated(&self) -> bool {
        self.max_size > 0 && self.active >= self.max_size
    }
}
