use crate::acquisition::supervisor::RetryPolicy;
use crate::sensors::{default_sensors, Sensor, SensorId};
use crate::{Error, Result};
use dotenvy::dotenv;
use regex::Regex;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Mobile sensor boxes upload to the shades database. Thermostat data is a
// fallback in case the boxes are offline.
const SHADES_URL: &str = "SHADES_DATABASE_URL";
const SHADES_LABEL: &str = "SHADES_DATABASE";
const THERMOSTAT_URL: &str = "THERMOSTAT_DATABASE_URL";
const THERMOSTAT_LABEL: &str = "MSSQL_DATABASE";

const SENSORS: &str = "SHADES_SENSORS";
const POLL_SECS: &str = "SHADES_POLL_SECS";
const LOOKBACK_SECS: &str = "SHADES_LOOKBACK_SECS";
const RETRY_MILLIS: &str = "SHADES_RETRY_MILLIS";
const MAX_ATTEMPTS: &str = "SHADES_MAX_ATTEMPTS";
const CONNECT_TIMEOUT_SECS: &str = "SHADES_CONNECT_TIMEOUT_SECS";
const READY_TIMEOUT_SECS: &str = "SHADES_READY_TIMEOUT_SECS";

const SENSOR_NAME: &str = r"^Sensor\d+$";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Name used in log messages
    pub label: String,
    pub url: String,
}

impl DatabaseSettings {
    pub fn new(label: &str, url: &str) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub sensors_db: DatabaseSettings,
    pub thermostat_db: DatabaseSettings,
    pub sensors: Vec<Sensor>,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    /// How old a reading may be and still count as current
    pub lookback: Duration,
    pub connect_timeout: Duration,
    /// `None` waits for readiness forever
    pub ready_timeout: Option<Duration>,
}

impl Settings {
    pub fn new(sensors_db: DatabaseSettings, thermostat_db: DatabaseSettings) -> Self {
        Self {
            sensors_db,
            thermostat_db,
            sensors: default_sensors(),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(60),
            lookback: Duration::from_secs(3600),
            connect_timeout: Duration::from_secs(15),
            ready_timeout: None,
        }
    }

    /// Reads the process environment, after loading `.env` if present
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| var(key).ok_or_else(|| Error::Config(format!("{key} must be set")));
        let sensors_db = DatabaseSettings {
            label: var(SHADES_LABEL).unwrap_or_else(|| "WFIC_CEVAC_Shades".into()),
            url: required(SHADES_URL)?,
        };
        let thermostat_db = DatabaseSettings {
            label: var(THERMOSTAT_LABEL).unwrap_or_else(|| "WFIC_CEVAC".into()),
            url: required(THERMOSTAT_URL)?,
        };
        let mut settings = Self::new(sensors_db, thermostat_db);

        if let Some(list) = var(SENSORS) {
            settings.sensors = parse_sensors(&list)?;
        }
        if let Some(secs) = parse_var::<u64>(&var, POLL_SECS)? {
            if secs == 0 {
                return Err(Error::Config(format!("{POLL_SECS} must be positive")));
            }
            settings.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&var, LOOKBACK_SECS)? {
            settings.lookback = Duration::from_secs(secs);
        }
        if let Some(millis) = parse_var::<u64>(&var, RETRY_MILLIS)? {
            if millis == 0 {
                return Err(Error::Config(format!("{RETRY_MILLIS} must be positive")));
            }
            settings.retry.interval = Duration::from_millis(millis);
        }
        settings.retry.max_attempts = match parse_var::<u32>(&var, MAX_ATTEMPTS)? {
            Some(0) => return Err(Error::Config(format!("{MAX_ATTEMPTS} must be positive"))),
            max => max,
        };
        if let Some(secs) = parse_var::<u64>(&var, CONNECT_TIMEOUT_SECS)? {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        settings.ready_timeout = parse_var::<u64>(&var, READY_TIMEOUT_SECS)?.map(Duration::from_secs);
        Ok(settings)
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("{key}={value}: {e}")))
        })
        .transpose()
}

/// Parses `8916=Sensor14,8921=Sensor15`
pub fn parse_sensors(list: &str) -> Result<Vec<Sensor>> {
    let re = Regex::new(SENSOR_NAME).map_err(|e| Error::Config(e.to_string()))?;
    let mut sensors: Vec<Sensor> = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, name) = item
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected id=name, got {item:?}")))?;
        let id = id
            .trim()
            .parse::<SensorId>()
            .map_err(|e| Error::Config(format!("sensor id {id:?}: {e}")))?;
        let name = name.trim();
        if !re.is_match(name) {
            return Err(Error::Config(format!("bad sensor name {name:?}")));
        }
        if sensors.iter().any(|s| s.id == id || s.name == name) {
            return Err(Error::Config(format!("duplicate sensor {item:?}")));
        }
        sensors.push(Sensor::new(id, name));
    }
    if sensors.is_empty() {
        return Err(Error::Config(format!("{SENSORS} lists no sensors")));
    }
    Ok(sensors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const URLS: [(&str, &str); 2] = [
        ("SHADES_DATABASE_URL", "/var/lib/shades/sensors.db"),
        ("THERMOSTAT_DATABASE_URL", "/var/lib/shades/thermostat.db"),
    ];

    #[test]
    fn test_defaults() {
        let settings = Settings::from_vars(vars(&URLS)).unwrap();
        assert_eq!(settings.sensors_db.label, "WFIC_CEVAC_Shades");
        assert_eq!(settings.sensors_db.url, "/var/lib/shades/sensors.db");
        assert_eq!(settings.thermostat_db.label, "WFIC_CEVAC");
        assert_eq!(settings.sensors, default_sensors());
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        assert_eq!(settings.lookback, Duration::from_secs(3600));
        assert_eq!(settings.ready_timeout, None);
    }

    #[test]
    fn test_overrides() {
        let mut pairs = URLS.to_vec();
        pairs.extend([
            ("MSSQL_DATABASE", "thermostats"),
            ("SHADES_SENSORS", "8916=Sensor14, 8921=Sensor15"),
            ("SHADES_POLL_SECS", "30"),
            ("SHADES_RETRY_MILLIS", "250"),
            ("SHADES_MAX_ATTEMPTS", "5"),
            ("SHADES_READY_TIMEOUT_SECS", "120"),
        ]);
        let settings = Settings::from_vars(vars(&pairs)).unwrap();
        assert_eq!(settings.thermostat_db.label, "thermostats");
        assert_eq!(settings.sensors.len(), 2);
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
        assert_eq!(settings.retry.interval, Duration::from_millis(250));
        assert_eq!(settings.retry.max_attempts, Some(5));
        assert_eq!(settings.ready_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_missing_url() {
        let result = Settings::from_vars(vars(&URLS[..1]));
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("THERMOSTAT_DATABASE_URL")));
    }

    #[test]
    fn test_bad_numbers() {
        let mut pairs = URLS.to_vec();
        pairs.push(("SHADES_POLL_SECS", "soon"));
        assert!(Settings::from_vars(vars(&pairs)).is_err());

        let mut pairs = URLS.to_vec();
        pairs.push(("SHADES_POLL_SECS", "0"));
        assert!(Settings::from_vars(vars(&pairs)).is_err());
    }

    #[test]
    fn test_zero_retry_settings_rejected() {
        for key in ["SHADES_RETRY_MILLIS", "SHADES_MAX_ATTEMPTS"] {
            let mut pairs = URLS.to_vec();
            pairs.push((key, "0"));
            let result = Settings::from_vars(vars(&pairs));
            assert!(matches!(result, Err(Error::Config(ref msg)) if msg.contains(key)), "{key}");
        }

        let mut pairs = URLS.to_vec();
        pairs.push(("SHADES_RETRY_MILLIS", "1"));
        pairs.push(("SHADES_MAX_ATTEMPTS", "1"));
        let settings = Settings::from_vars(vars(&pairs)).unwrap();
        assert_eq!(settings.retry.interval, Duration::from_millis(1));
        assert_eq!(settings.retry.max_attempts, Some(1));
    }

    #[test]
    fn test_parse_sensors() {
        let sensors = parse_sensors("8916=Sensor14,8939=Sensor17,").unwrap();
        assert_eq!(
            sensors,
            vec![Sensor::new(8916, "Sensor14"), Sensor::new(8939, "Sensor17")]
        );
    }

    #[test]
    fn test_parse_sensors_rejects_bad_input() {
        assert!(parse_sensors("").is_err());
        assert!(parse_sensors("8916").is_err());
        assert!(parse_sensors("abc=Sensor14").is_err());
        assert!(parse_sensors("8916=Sensor14' OR 1=1 --").is_err());
        assert!(parse_sensors("8916=Sensor14,8916=Sensor15").is_err());
    }
}
