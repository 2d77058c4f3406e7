use super::{Reading, ReadingUpdate, SensorId};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Latest known reading per configured sensor.
///
/// Every configured sensor has an entry from construction on, seeded with
/// zeroes. Entries are never added or removed afterwards, only overwritten.
/// Clones share the same storage.
#[derive(Clone, Debug)]
pub struct SensorCache {
    inner: Arc<RwLock<HashMap<SensorId, Reading>>>,
}

impl SensorCache {
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = SensorId>,
    {
        let readings = ids.into_iter().map(|id| (id, Reading::default())).collect();
        Self {
            inner: Arc::new(RwLock::new(readings)),
        }
    }

    pub fn get(&self, id: SensorId) -> Option<Reading> {
        let readings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        readings.get(&id).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<SensorId, Reading> {
        let readings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        readings.iter().map(|(id, r)| (*id, *r)).collect()
    }

    /// Returns the stored reading after the update was applied.
    pub fn apply(&self, id: SensorId, update: ReadingUpdate) -> Result<Reading> {
        let mut readings = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let reading = readings.get_mut(&id).ok_or(Error::UnknownSensor(id))?;
        reading.apply(update);
        Ok(*reading)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
