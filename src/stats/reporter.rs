// src/stats/reporter.rs
use crate::miner::farm::Farm;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Periodically logs farm snapshots from a background thread
///
/// Each report is three lines: the rate line, the share line and, when the
/// farm has non-CPU devices, the temperature line.
pub struct StatsReporter {
    farm: Arc<Farm>,
    /// Interval at which stats are reported
    report_interval: Duration,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatsReporter {
    /// Creates a reporter for `farm`; nothing is logged until started
    ///
    /// # Arguments
    /// * `farm` - Farm to snapshot
    /// * `report_interval` - How often to log statistics
    pub fn new(farm: Arc<Farm>, report_interval: Duration) -> Self {
        StatsReporter {
            farm,
            report_interval,
            shutdown: None,
            handle: None,
        }
    }

    /// Logs one report immediately
    pub fn report(&self) {
        log_report(&self.farm);
    }

    /// Starts the periodic reporting thread; a second call does nothing
    pub fn start_reporting(&mut self) -> std::io::Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let (tx, rx) = crossbeam_channel::bounded::<()>(0);
        let farm = self.farm.clone();
        let interval = self.report_interval;

        let handle = std::thread::Builder::new()
            .name("stats".into())
            .spawn(move || {
                loop {
                    match rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => log_report(&farm),
                        // Explicit stop or the reporter was dropped.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        self.shutdown = Some(tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stops the reporting thread and waits for it
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel.
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("stats reporter thread panicked");
            }
        }
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn log_report(farm: &Farm) {
    let progress = farm.working_progress();
    log::info!("{}", progress);
    log::info!("{}", farm.solution_stats());

    let temperature = progress.temperature_line();
    if !temperature.is_empty() {
        log::info!("{}", temperature);
    }
}
