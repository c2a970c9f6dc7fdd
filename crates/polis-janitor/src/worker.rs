//! Background worker for continuous status refresh

use crate::{Janitor, JanitorConfig, JanitorError, JanitorMetrics};
use chrono::{Local, NaiveDate};
use polis_domain::traits::PolicyStore;
use tokio::time::{interval, Duration};

/// Background worker that runs the Janitor on a schedule
///
/// Each cycle sweeps with the local calendar date as the reference day,
/// unless a fixed date was set with [`JanitorWorker::with_reference_date`].
///
/// # Examples
///
/// ```no_run
/// use polis_janitor::{JanitorConfig, JanitorWorker};
/// use polis_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteStore::new("polis.db")?;
///     let mut worker = JanitorWorker::new(JanitorConfig::default());
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run(store).await?;
///     Ok(())
/// }
/// ```
pub struct JanitorWorker {
    janitor: Janitor,
    interval: Duration,
    reference_date: Option<NaiveDate>,
}

impl JanitorWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        let interval = config.sweep_interval();
        Self {
            janitor: Janitor::new(config),
            interval,
            reference_date: None,
        }
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Sweep as of a fixed day instead of the local date
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub async fn run<S>(&mut self, mut store: S) -> Result<(), JanitorError>
    where
        S: PolicyStore,
        S::Error: std::fmt::Display,
    {
        if self.interval.is_zero() {
            return Err(JanitorError::Config("sweep interval must be greater than 0".to_string()));
        }
        let mut ticker = interval(self.interval);

        tracing::info!("Janitor worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let today = self.today();
                    tracing::debug!("Starting sweep cycle for {}", today);

                    match self.janitor.sweep(&mut store, today) {
                        Ok(report) => {
                            tracing::info!(
                                "Sweep completed: {} checked, {} changed",
                                report.checked,
                                report.changed()
                            );
                        }
                        Err(e) => {
                            tracing::error!("Sweep failed: {}", e);
                        }
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        return Err(JanitorError::Worker(format!("Failed to listen for shutdown: {}", e)));
                    }
                    tracing::info!("Shutdown signal received, stopping janitor");
                    break;
                }
            }
        }

        tracing::info!("Janitor stopped. Final metrics:\n{}", self.janitor.metrics().summary());

        Ok(())
    }

    /// Run for a specific number of cycles, stopping at the first failure
    ///
    /// The first cycle runs immediately; later ones wait for the interval.
    pub async fn run_cycles<S>(&mut self, store: &mut S, cycles: usize) -> Result<(), JanitorError>
    where
        S: PolicyStore,
        S::Error: std::fmt::Display,
    {
        if self.interval.is_zero() {
            return Err(JanitorError::Config("sweep interval must be greater than 0".to_string()));
        }
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Janitor worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            let today = self.today();
            tracing::debug!("Starting sweep cycle {}/{} for {}", cycle + 1, cycles, today);

            match self.janitor.sweep(store, today) {
                Ok(report) => {
                    tracing::info!(
                        "Sweep {}/{} completed: {} checked, {} changed",
                        cycle + 1,
                        cycles,
                        report.checked,
                        report.changed()
                    );
                }
                Err(e) => {
                    tracing::error!("Sweep {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Janitor finished {} cycles. Final metrics:\n{}",
            cycles,
            self.janitor.metrics().summary()
        );

        Ok(())
    }

    /// Get a reference to the janitor's current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        self.janitor.metrics()
    }

    /// Reset the janitor's metrics counters
    pub fn reset_metrics(&mut self) {
        self.janitor.reset_metrics();
    }
}
