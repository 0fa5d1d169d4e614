//! Daemon: the monitor's polling loop.
//!
//! The loop is single-threaded and never exits on its own:
//!
//! 1. Run one aggregation cycle
//! 2. Log the outcome; a failed cycle is logged and retried next tick
//! 3. Sleep for the fixed interval
//!
//! There is no jitter or backoff. A slow store call simply delays the next
//! tick.

use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::aggregator::{Aggregator, CycleOutcome};
use crate::error::CycleError;
use crate::store::ConfigStore;

/// Configuration for the daemon loop.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
}


impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            interval: Duration::from_secs(10),
        }
    }
}


pub struct Daemon<S: ConfigStore> {
    aggregator: Aggregator<S>,
    config: DaemonConfig,
    ticks: u64,
}


impl<S: ConfigStore> Daemon<S> {
    pub fn new(aggregator: Aggregator<S>, config: DaemonConfig) -> Self {
        Daemon {
            aggregator,
            config,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run the loop forever.
    pub fn run(&mut self) -> ! {
        info!(
            prefix = self.aggregator.prefix(),
            snapshot = %self.aggregator.snapshots().path().display(),
            interval_secs = self.config.interval.as_secs(),
            "scope monitor started"
        );
        loop {
            let _ = self.tick();
            thread::sleep(self.config.interval);
        }
    }

    /// Run exactly one cycle, logging failures. The result is returned so
    /// one-shot callers can turn it into an exit status.
    pub fn tick(&mut self) -> Result<CycleOutcome, CycleError> {
        self.ticks += 1;
        let result = self.aggregator.run_cycle();
        if let Err(e) = &result {
            error!(error = %e, "error processing config objects");
        }
        result
    }
}
