use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_DIR: &str = "./logs";
/// The file always gets the crate's debug output, whatever the console shows.
const FILE_FILTER: &str = "warn,homework_collector=debug";

/// Console output follows `TRACING_LEVEL` (default `info`). Each run also
/// writes its own file, `homework-collector-<timestamp>.log` under `LOG_DIR`,
/// unless `LOG_FILE_PATH` names one explicitly.
pub fn init_logger() -> impl Drop {
    let console_filter = EnvFilter::new(
        env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string()),
    );

    let (dir, file_name) = log_file_location(
        env::var("LOG_FILE_PATH").ok().as_deref(),
        env::var("LOG_DIR").ok().as_deref(),
        Local::now(),
    );
    let file_appender = tracing_appender::rolling::never(&dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_thread_names(true)
                .with_filter(EnvFilter::new(FILE_FILTER)),
        )
        .init();

    info!("Logging this run to {}", dir.join(&file_name).display());

    guard
}

/// Directory and file name of this run's log.
fn log_file_location(
    explicit: Option<&str>,
    log_dir: Option<&str>,
    started: DateTime<Local>,
) -> (PathBuf, String) {
    if let Some(path) = explicit.map(Path::new) {
        if let Some(name) = path.file_name() {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            return (dir.to_path_buf(), name.to_string_lossy().into_owned());
        }
    }
    let dir = PathBuf::from(log_dir.unwrap_or(DEFAULT_LOG_DIR));
    let name = format!("homework-collector-{}.log", started.format("%Y%m%d-%H%M%S"));
    (dir, name)
}
