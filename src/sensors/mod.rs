pub mod cache;

pub use cache::SensorCache;

use serde::Serialize;

pub type SensorId = u32;

/// Mobile sensor boxes that can be moved around the building and upload
/// their data to the shades database.
const MOBILE_SENSORS: [(SensorId, &str); 4] = [
    (8916, "Sensor14"),
    (8921, "Sensor15"),
    (8935, "Sensor16"),
    (8939, "Sensor17"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
}

impl Sensor {
    pub fn new(id: SensorId, name: &str) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

pub fn default_sensors() -> Vec<Sensor> {
    MOBILE_SENSORS
        .iter()
        .map(|(id, name)| Sensor::new(*id, name))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Humidity,
}

impl Metric {
    /// Literal stored in the `Metric` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temp(F)",
            Metric::Humidity => "Humidity",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    pub fn apply(&mut self, update: ReadingUpdate) {
        if let Some(t) = update.temperature {
            self.temperature = t;
        }
        if let Some(h) = update.humidity {
            self.humidity = h;
        }
    }
}

/// Result of one poll for a sensor. A `None` field had no row inside the
/// lookback window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReadingUpdate {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl ReadingUpdate {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sensors() {
        let sensors = default_sensors();
        assert_eq!(sensors.len(), 4);
        assert_eq!(sensors[0], Sensor::new(8916, "Sensor14"));
        assert_eq!(sensors[3], Sensor::new(8939, "Sensor17"));
    }

    #[test]
    fn test_metric_literals() {
        assert_eq!(Metric::Temperature.as_str(), "Temp(F)");
        assert_eq!(Metric::Humidity.as_str(), "Humidity");
    }

    #[test]
    fn test_apply_partial_update() {
        let mut reading = Reading {
            temperature: 70.0,
            humidity: 35.0,
        };
        reading.apply(ReadingUpdate {
            temperature: None,
            humidity: Some(41.5),
        });
        assert_eq!(reading.temperature, 70.0);
        assert_eq!(reading.humidity, 41.5);

        reading.apply(ReadingUpdate::default());
        assert_eq!(
            reading,
            Reading {
                temperature: 70.0,
                humidity: 41.5
            }
        );
    }

    #[test]
    fn test_empty_update() {
        assert!(ReadingUpdate::default().is_empty());
        assert!(!ReadingUpdate {
            temperature: Some(0.0),
            humidity: None
        }
        .is_empty());
    }
}
