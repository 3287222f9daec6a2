//! Per-session failure tracking, kept as plain state transitions on
//! explicit timestamps rather than reading a wall
//! clock internally, so the eviction/warning rules are exercised without
//! real sleeps.

/// Outcome of recording one heartbeat result against a [`HeartbeatEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The heartbeat succeeded; the failure streak was reset (or was
    /// already zero).
    Ok,
    /// The heartbeat failed but the session stays registered.
    Failed { consecutive_failures: u64 },
    /// The heartbeat failed and crossed an eviction threshold. The
    /// caller must remove the entry from its table.
    Evicted {
        consecutive_failures: u64,
        failure_duration_ms: u64,
    },
}

/// State tracked for one session between heartbeats.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatEntry {
    consecutive_failures: u64,
    first_failure_at_ms: Option<u64>,
    /// Set once the warning-threshold log has fired for the current
    /// failure incident, so it isn't repeated on every subsequent
    /// failure of the same incident.
    warned: bool,
}

impl HeartbeatEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures
    }

    pub fn first_failure_at_ms(&self) -> Option<u64> {
        self.first_failure_at_ms
    }

    /// Records a heartbeat result observed at `now_ms`, applying the
    /// reset-on-success / count-or-duration eviction rule. Returns whether
    /// the warning-threshold log should fire (true only the first time an
    /// incident crosses `warning_threshold_ms`).
    pub fn record(
        &mut self,
        now_ms: u64,
        success: bool,
        max_failure_count: u64,
        max_failure_duration_ms: u64,
        warning_threshold_ms: u64,
    ) -> (HeartbeatOutcome, bool) {
        if success {
            self.consecutive_failures = 0;
            self.first_failure_at_ms = None;
            self.warned = false;
            return (HeartbeatOutcome::Ok, false);
        }

        self.consecutive_failures += 1;
        let first_failure_at_ms = *self.first_failure_at_ms.get_or_insert(now_ms);
        let failure_duration_ms = now_ms.saturating_sub(first_failure_at_ms);

        let should_warn = !self.warned && failure_duration_ms >= warning_threshold_ms;
        if should_warn {
            self.warned = true;
        }

        if self.consecutive_failures >= max_failure_count
            || failure_duration_ms >= max_failure_duration_ms
        {
            (
                HeartbeatOutcome::Evicted {
                    consecutive_failures: self.consecutive_failures,
                    failure_duration_ms,
                },
                should_warn,
            )
        } else {
            (
                HeartbeatOutcome::Failed {
                    consecutive_failures: self.consecutive_failures,
                },
                should_warn,
            )
        }
    }
}
