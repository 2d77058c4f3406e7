// In-memory stand-ins for the database backend

use super::polling::ReadingSource;
use super::Connector;
use crate::config::DatabaseSettings;
use crate::sensors::Metric;
use crate::{Error, Result, Timestamp};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

type Query = (String, Metric, Timestamp);

/// Answers queries from per sensor/metric queues; an empty queue means no
/// row inside the lookback window.
#[derive(Clone, Default)]
pub(crate) struct ScriptedSource {
    responses: Arc<Mutex<HashMap<(String, Metric), VecDeque<Result<Option<f64>>>>>>,
    queries: Arc<Mutex<Vec<Query>>>,
}

impl ScriptedSource {
    pub(crate) fn push(&self, sensor: &str, metric: Metric, response: Result<Option<f64>>) {
        self.responses
            .lock()
            .unwrap()
            .entry((sensor.into(), metric))
            .or_default()
            .push_back(response);
    }

    pub(crate) fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }
}

impl ReadingSource for ScriptedSource {
    async fn latest_reading(&self, sensor: &str, metric: Metric, since: Timestamp) -> Result<Option<f64>> {
        self.queries.lock().unwrap().push((sensor.into(), metric, since));
        let mut responses = self.responses.lock().unwrap();
        responses
            .get_mut(&(sensor.to_string(), metric))
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(None))
    }
}

/// Refuses the first `n` connections to a database label, then hands out
/// the shared scripted source.
#[derive(Default)]
pub(crate) struct FlakyConnector {
    pub(crate) source: ScriptedSource,
    refusals: Mutex<HashMap<String, u32>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl FlakyConnector {
    pub(crate) fn refuse(&self, label: &str, n: u32) {
        self.refusals.lock().unwrap().insert(label.into(), n);
    }

    pub(crate) fn attempts(&self, label: &str) -> u32 {
        self.attempts.lock().unwrap().get(label).copied().unwrap_or(0)
    }
}

impl Connector for FlakyConnector {
    type Pool = ScriptedSource;

    async fn connect(&self, database: &DatabaseSettings) -> Result<ScriptedSource> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(database.label.clone())
            .or_default() += 1;
        let mut refusals = self.refusals.lock().unwrap();
        match refusals.get_mut(&database.label) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(Error::Connect {
                    label: database.label.clone(),
                    reason: "connection refused".into(),
                })
            }
            _ => Ok(self.source.clone()),
        }
    }
}
