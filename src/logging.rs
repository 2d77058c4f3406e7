use std::ffi::OsStr;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber. Keep the returned guards alive for the
/// whole program, or buffered file output is lost.
pub fn init(level: Level, console: bool, log_file: Option<&Path>) -> Vec<WorkerGuard> {
    let mut guards = Vec::new();

    let file_layer = log_file.map(|path| {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| OsStr::new("shades.log"));
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
        guards.push(guard);
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .compact()
    });

    let console_layer = console.then(|| {
        fmt::layer()
            .with_level(true) // include levels in formatted output
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(file_layer)
        .with(console_layer)
        .init();
    guards
}
