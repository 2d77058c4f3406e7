use super::readiness::{Milestone, ReadinessGate};
use crate::sensors::{Metric, ReadingUpdate, Sensor, SensorCache};
use crate::{Result, Timestamp};
use chrono::prelude::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Where the latest value of a sensor metric comes from
pub trait ReadingSource {
    /// Most recent reading of `metric` for `sensor` taken after `since`, if any
    fn latest_reading(
        &self,
        sensor: &str,
        metric: Metric,
        since: Timestamp,
    ) -> impl Future<Output = Result<Option<f64>>> + Send;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

pub struct Poller<S> {
    source: S,
    sensors: Vec<Sensor>,
    cache: SensorCache,
    lookback: Duration,
}

impl<S> Poller<S>
where
    S: ReadingSource + Sync,
{
    pub fn new(source: S, sensors: Vec<Sensor>, cache: SensorCache, lookback: Duration) -> Self {
        Self {
            source,
            sensors,
            cache,
            lookback,
        }
    }

    fn cutoff(&self) -> Timestamp {
        chrono::Duration::from_std(self.lookback)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    async fn fetch(&self, sensor: &Sensor, since: Timestamp) -> Result<ReadingUpdate> {
        let temperature = self
            .source
            .latest_reading(&sensor.name, Metric::Temperature, since)
            .await?;
        let humidity = self
            .source
            .latest_reading(&sensor.name, Metric::Humidity, since)
            .await?;
        Ok(ReadingUpdate {
            temperature,
            humidity,
        })
    }

    /// One pass over all sensors, in order. A failing sensor is logged and
    /// skipped; the rest of the pass goes on.
    pub async fn update_sensor_data(&self) -> CycleReport {
        info!("Updating live sensor readings...");
        let since = self.cutoff();
        let mut report = CycleReport::default();
        for sensor in &self.sensors {
            let update = match self.fetch(sensor, since).await {
                Ok(update) => update,
                Err(e) => {
                    error!("[{}] {:9} query failed: {e}", sensor.id, sensor.name);
                    report.failed += 1;
                    continue;
                }
            };
            if update.is_empty() {
                debug!(
                    "[{}] {:9} no readings since {}",
                    sensor.id,
                    sensor.name,
                    since.format("%H:%M:%S")
                );
                report.unchanged += 1;
                continue;
            }
            match self.cache.apply(sensor.id, update) {
                Ok(reading) => {
                    debug!(
                        "[{}] {:9} T = {:0.1}, RH = {:0.1}",
                        sensor.id, sensor.name, reading.temperature, reading.humidity
                    );
                    report.updated += 1;
                }
                Err(e) => {
                    error!("[{}] {:9} {e}", sensor.id, sensor.name);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Polls until `cancel` fires, waiting `interval` after each pass ends.
    /// The first completed pass is reported to `gate`.
    pub async fn run(self, interval: Duration, gate: Arc<ReadinessGate>, cancel: CancellationToken) {
        loop {
            let report = self.update_sensor_data().await;
            info!(
                "Sensor poll done: {} updated, {} unchanged, {} failed",
                report.updated, report.unchanged, report.failed
            );
            gate.mark(Milestone::FirstPollDone);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("Sensor polling stopped");
    }
}
