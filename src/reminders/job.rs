//! In-process periodic reminder scan.

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::scanner::{ReminderScanner, ScanError, ScanReport};
use crate::clock::Clock;

/// Background loop that runs [`ReminderScanner::scan`] on a fixed interval.
pub struct ReminderJob {
    scanner: ReminderScanner,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    interval: Duration,
    /// Optional sink for completed scan reports.
    report_tx: Option<mpsc::UnboundedSender<ScanReport>>,
}

impl ReminderJob {
    pub fn new(
        scanner: ReminderScanner,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        interval: Duration,
    ) -> Self {
        Self {
            scanner,
            clock,
            offset,
            interval: interval.max(Duration::from_secs(1)),
            report_tx: None,
        }
    }

    /// Forward every completed scan report to `tx`.
    #[must_use]
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<ScanReport>) -> Self {
        self.report_tx = Some(tx);
        self
    }

    /// Start the background loop. The first scan runs immediately.
    pub fn run(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "reminder job started");
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if !self.tick().await {
                    debug!("reminder report channel closed, stopping");
                    return;
                }
            }
        })
    }

    /// Run one scan. Returns `false` once the report channel is closed.
    async fn tick(&self) -> bool {
        let now = self.clock.now_in(self.offset);
        match self.scanner.scan(now).await {
            Ok(report) => {
                if let Some(tx) = &self.report_tx {
                    return tx.send(report).is_ok();
                }
            }
            Err(ScanError::InProgress) => {
                debug!("reminder tick skipped; scan in progress");
            }
            Err(e) => {
                error!("reminder scan failed: {e}");
            }
        }
        true
    }
}
