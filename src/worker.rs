//! Background unit: re-reads the shared config every cycle and acts on it.

use std::thread;
use std::time::Duration;
use tracing::info;

use crate::config::{ConfigStore, Configuration};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

pub struct Worker {
    store: ConfigStore,
    interval: Duration,
}

impl Worker {
    pub fn new(store: ConfigStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// One pass: load the latest config and do the work for it.
    pub fn cycle(&self) -> Configuration {
        let config = self.store.load();
        // Placeholder for the appliance's real job.
        info!(
            "Hello from worker service... folder={:?} mode={:?} note={:?}",
            config.folder, config.mode, config.note
        );
        config
    }

    /// Runs until the process is killed.
    pub fn run(&self) -> ! {
        info!(
            "Worker started (config: {:?}, interval: {:?})",
            self.store.path(),
            self.interval
        );
        loop {
            self.cycle();
            thread::sleep(self.interval);
        }
    }
}
