//! Scheduled Jobs
//!
//! Periodic balance snapshots for every user.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::ledger::SnapshotRecorder;

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for the snapshot scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval between snapshot runs (default: 1 hour)
    pub snapshot_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_secs(3600),
        }
    }
}

/// Snapshot Scheduler - records every user's balance on an interval
pub struct SnapshotScheduler {
    recorder: SnapshotRecorder,
    config: JobSchedulerConfig,
}

impl SnapshotScheduler {
    pub fn new(recorder: SnapshotRecorder) -> Self {
        Self {
            recorder,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(recorder: SnapshotRecorder, config: JobSchedulerConfig) -> Self {
        Self { recorder, config }
    }

    /// Start the scheduler in the background.
    /// Returns a handle that can be used to abort it.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.snapshot_interval.as_secs(),
            "Snapshot scheduler started"
        );

        let mut ticker = interval(self.config.snapshot_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = self.run_once().await;
            for error in &report.errors {
                tracing::error!(error = %error, "Balance snapshot job failed");
            }
        }
    }

    /// Snapshot all users once (for manual trigger or testing)
    pub async fn run_once(&self) -> SnapshotReport {
        let mut report = SnapshotReport::default();

        match self.recorder.record_all_user_balances().await {
            Ok(snapshots) => report.snapshots_recorded = snapshots.len(),
            Err(e) => report.errors.push(format!("Balance snapshots: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from one snapshot run
#[derive(Debug, Clone, Default)]
pub struct SnapshotReport {
    pub snapshots_recorded: usize,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl SnapshotReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
