//! Periodic timestamp record injection

use crate::server::Journal;
use crate::types::Record;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Appends a `timestamp:<local time>` record to the journal once per
/// period.
///
/// The emitter only ever appends; it never reads the journal back and
/// never transmits anything.
pub struct TimestampEmitter {
    journal: Arc<Journal>,
    period: Duration,
}

impl TimestampEmitter {
    /// Create an emitter writing into `journal` every `period`.
    pub fn new(journal: Arc<Journal>, period: Duration) -> Self {
        Self { journal, period }
    }

    /// Run until the shutdown channel fires.
    ///
    /// The first record lands one full period after startup. Once shutdown
    /// is observed the pending tick is abandoned, so no record is written
    /// after the signal.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately; consume it
        // so the first record waits out a full period.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let record = Record::timestamp(Local::now());
                    debug!("Appending {}", record);
                    self.journal.append(&record).await;
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }
}
