use crate::argparse::Commands;
use anyhow::{Context, Result};
use shades::acquisition::AcquisitionService;
use shades::config::Settings;
use shades::database::{self, SqliteConnector};
use std::time::Duration;
use tokio::signal;
use tracing::{info, Level};

// Include these modules as part of the binary crate, not the library crate
// as this contains the actual implementation of the logging facility
mod argparse;
mod logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = argparse::parse();

    let level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let _guards = logging::init(level, cli.console, Some(cli.log_file.as_path()));

    let mut settings = Settings::from_env().context("Loading settings from environment")?;

    match cli.command {
        Commands::Migrate {} => {
            let url = settings.sensors_db.url.clone();
            let timeout = settings.connect_timeout;
            tokio::task::spawn_blocking(move || -> shades::Result<()> {
                let pool = database::connect(&url, timeout)?;
                database::run_migrations(&pool)
            })
            .await?
            .context("Migrating sensor database")?;
            Ok(())
        }
        Commands::Run { once, poll_secs } => {
            if let Some(secs) = poll_secs {
                settings.poll_interval = Duration::from_secs(secs.max(1));
            }
            run(settings, once).await
        }
    }
}

async fn run(settings: Settings, once: bool) -> Result<()> {
    let connector = SqliteConnector::new(settings.connect_timeout);
    let service = AcquisitionService::init(settings, connector);

    let ready = tokio::select! {
        ready = service.ensure_connection() => Some(ready),
        _ = signal::ctrl_c() => None,
    };
    match ready {
        None => {
            service.shutdown().await;
            return Ok(());
        }
        Some(Err(e)) => {
            service.shutdown().await;
            return Err(e).context("Waiting for data acquisition");
        }
        Some(Ok(())) => info!("Serving {} sensor readings", service.cache().len()),
    }

    if once {
        let snapshot = serde_json::to_string_pretty(&service.cache().snapshot())?;
        println!("{snapshot}");
    } else {
        // Nothing to do on the main task,
        // simply waits here
        signal::ctrl_c().await?;
    }
    service.shutdown().await;
    Ok(())
}
