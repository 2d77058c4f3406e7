pub mod models;
pub mod schema;

use crate::acquisition::polling::ReadingSource;
use crate::acquisition::Connector;
use crate::config::DatabaseSettings;
use crate::sensors::Metric;
use crate::{Error, Result, Timestamp};
use models::SensorEntry;
use std::time::Duration;
use tokio::task;
use tracing::{debug, info};

use diesel::prelude::*;
use diesel::r2d2::ConnectionManager;
use diesel::sqlite::Sqlite;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

pub type Db = Sqlite;
pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Builds a pool, failing if no connection can be opened within `timeout`.
/// Blocks the calling thread.
pub fn connect(url: &str, timeout: Duration) -> Result<Pool> {
    let manager = ConnectionManager::<SqliteConnection>::new(url);
    let pool = r2d2::Pool::builder()
        .connection_timeout(timeout)
        .build(manager)?;
    debug!("Opened connection pool on {url}");
    Ok(pool)
}

pub fn run_migrations(pool: &Pool) -> Result<()> {
    let mut pooled = pool.get()?;
    let connection: &mut SqliteConnection = &mut pooled;
    let pending = connection
        .has_pending_migration(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    if pending {
        info!("Applying pending migrations");
        connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Migration(e.to_string()))?;
    }
    Ok(())
}

/// Newest `wanted` row for sensor `name` taken after `since`
pub async fn latest_entry(
    pool: &Pool,
    name: &str,
    wanted: Metric,
    since: Timestamp,
) -> Result<Option<SensorEntry>> {
    use self::schema::sensor_data::dsl::*;

    let sql = sensor_data
        .filter(metric.eq(wanted.as_str()))
        .filter(sensor.eq(name.to_owned()))
        .filter(date_time.gt(since.naive_utc()))
        .order(date_time.desc())
        .limit(1)
        .select(SensorEntry::as_select());

    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    let pool = pool.clone();
    task::spawn_blocking(move || -> Result<Option<SensorEntry>> {
        let mut conn = pool.get()?;
        Ok(sql.get_result(&mut conn).optional()?)
    })
    .await?
}

impl ReadingSource for Pool {
    async fn latest_reading(&self, sensor: &str, metric: Metric, since: Timestamp) -> Result<Option<f64>> {
        let entry = latest_entry(self, sensor, metric, since).await?;
        if let Some(ref e) = entry {
            debug!("{} {} = {} @ {}", e.sensor, e.metric, e.reading, e.date_time);
        }
        Ok(entry.map(|e| e.reading))
    }
}

#[derive(Clone, Debug)]
pub struct SqliteConnector {
    timeout: Duration,
}

impl SqliteConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Connector for SqliteConnector {
    type Pool = Pool;

    async fn connect(&self, database: &DatabaseSettings) -> Result<Pool> {
        let url = database.url.clone();
        let timeout = self.timeout;
        task::spawn_blocking(move || connect(&url, timeout))
            .await?
            .map_err(|e| Error::Connect {
                label: database.label.clone(),
                reason: e.to_string(),
            })
    }
}
