pub mod polling;
pub mod readiness;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::{DatabaseSettings, Settings};
use crate::sensors::SensorCache;
use crate::{Error, Result};
use polling::{Poller, ReadingSource};
use readiness::{Milestone, ReadinessGate};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Opens a connection pool for a configured database
pub trait Connector: Send + Sync + 'static {
    type Pool: ReadingSource + Clone + Send + Sync + 'static;

    fn connect(&self, database: &DatabaseSettings) -> impl Future<Output = Result<Self::Pool>> + Send;
}

/// A supervisor that ran out of attempts fails the readiness gate.
/// Cancellation is the normal way out on shutdown.
fn report_give_up(gate: &ReadinessGate, e: Error) {
    match e {
        Error::ConnectGaveUp { ref label, attempts } => {
            error!("{e}");
            gate.fail(label, attempts);
        }
        Error::Cancelled => debug!("Connection attempts stopped by shutdown"),
        e => error!("{e}"),
    }
}

/// Owns the data acquisition side of the dashboard: both database pools,
/// the sensor cache, the poll task and the readiness gate.
pub struct AcquisitionService<C: Connector> {
    cache: SensorCache,
    gate: Arc<ReadinessGate>,
    thermostat: Arc<OnceLock<C::Pool>>,
    sensors: Arc<OnceLock<C::Pool>>,
    ready_timeout: Option<Duration>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: Connector> AcquisitionService<C> {
    /// Starts connecting to both databases and returns at once.
    /// Must be called from within a Tokio runtime.
    pub fn init(settings: Settings, connector: C) -> Self {
        let connector = Arc::new(connector);
        let cache = SensorCache::new(settings.sensors.iter().map(|s| s.id));
        let gate = Arc::new(ReadinessGate::new());
        let thermostat = Arc::new(OnceLock::new());
        let sensors = Arc::new(OnceLock::new());
        let cancel = CancellationToken::new();
        info!(
            "Tracking {} mobile sensors, polling every {}s",
            settings.sensors.len(),
            settings.poll_interval.as_secs()
        );

        let thermostat_task = {
            let connector = connector.clone();
            let database = settings.thermostat_db.clone();
            let policy = settings.retry.clone();
            let gate = gate.clone();
            let slot = thermostat.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let connected = supervisor::connect(
                    &database.label,
                    &policy,
                    &cancel,
                    || connector.connect(&database),
                    Some(|pool: &C::Pool| {
                        let _ = slot.set(pool.clone());
                        gate.mark(Milestone::ThermostatConnected);
                    }),
                )
                .await;
                if let Err(e) = connected {
                    report_give_up(&gate, e);
                }
            })
        };

        let sensors_task = {
            let connector = connector.clone();
            let database = settings.sensors_db.clone();
            let policy = settings.retry.clone();
            let gate = gate.clone();
            let slot = sensors.clone();
            let cache = cache.clone();
            let cancel = cancel.clone();
            let tracked = settings.sensors.clone();
            let (interval, lookback) = (settings.poll_interval, settings.lookback);
            tokio::spawn(async move {
                let connected = supervisor::connect(
                    &database.label,
                    &policy,
                    &cancel,
                    || connector.connect(&database),
                    Some(|pool: &C::Pool| {
                        let _ = slot.set(pool.clone());
                        gate.mark(Milestone::SensorsConnected);
                    }),
                )
                .await;
                match connected {
                    Ok(pool) => {
                        Poller::new(pool, tracked, cache, lookback)
                            .run(interval, gate, cancel)
                            .await
                    }
                    Err(e) => report_give_up(&gate, e),
                }
            })
        };

        Self {
            cache,
            gate,
            thermostat,
            sensors,
            ready_timeout: settings.ready_timeout,
            cancel,
            tasks: vec![thermostat_task, sensors_task],
        }
    }

    /// Resolves once both databases are connected and the first sensor poll
    /// has completed. Fails if a database gave up connecting. Waits forever
    /// unless a ready timeout is configured.
    pub async fn ensure_connection(&self) -> Result<()> {
        match self.ready_timeout {
            Some(timeout) => self.gate.wait_timeout(timeout).await,
            None => self.gate.wait().await,
        }
    }

    pub fn cache(&self) -> &SensorCache {
        &self.cache
    }

    pub fn readiness(&self) -> Arc<ReadinessGate> {
        self.gate.clone()
    }

    /// Fallback data source, once connected
    pub fn thermostat_pool(&self) -> Option<&C::Pool> {
        self.thermostat.get()
    }

    pub fn sensor_pool(&self) -> Option<&C::Pool> {
        self.sensors.get()
    }

    /// Stops pending connection retries and the poll timer, then waits for
    /// every task to finish.
    pub async fn shutdown(self) {
        info!("Shutting down data acquisition");
        self.cancel.cancel();
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                error!("Acquisition task failed: {e}");
            }
        }
    }
}
