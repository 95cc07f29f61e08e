use std::path::Path;

use anyhow::{Context, Result};
use tracing::{metadata::LevelFilter, *};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use crate::{cli, settings::manager::Settings};

// Start logger, should be done inside main
pub fn init(settings: &Settings, verbose: bool) -> Result<()> {
    // Redirect all logs from libs using "Log"
    LogTracer::init_with_filter(tracing::log::LevelFilter::Trace)
        .context("Failed to set logger")?;

    // Configure the console log
    let console_env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new(LevelFilter::DEBUG.to_string()),
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .with_context(|| format!("Invalid log level {:?}", settings.log_level))?,
    };

    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(fmt::format::FmtSpan::NONE)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_filter(filter_unwanted_crates(console_env_filter)?);

    // Configure the file log
    let file_env_filter = if verbose {
        EnvFilter::new(LevelFilter::TRACE.to_string())
    } else {
        EnvFilter::new(LevelFilter::DEBUG.to_string())
    };
    let file_appender = file_appender(&settings.log_file)?;
    let file_layer = fmt::Layer::new()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(fmt::format::FmtSpan::NONE)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_filter(filter_unwanted_crates(file_env_filter)?);

    // Configure the default subscriber
    let subscriber = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Unable to set a global subscriber")?;

    info!(
        "{}, version: {}, build date: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_BUILD_DATE").unwrap_or("?"),
    );
    info!(
        "Starting at {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
    );
    info!("Server running at {}", settings.server_address());
    debug!("Command line call: {}", cli::manager::command_line_string());
    debug!("Logging to {}", settings.log_file.display());

    Ok(())
}

/// The rolling appender wants a directory and a file name prefix
fn split_log_file(log_file: &Path) -> (&Path, &std::ffi::OsStr) {
    let dir = log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new(crate::settings::manager::LOG_FILE_NAME));

    (dir, file_name)
}

/// Daily rolling file, failing if its directory can't be created
fn file_appender(log_file: &Path) -> Result<RollingFileAppender> {
    let (dir, file_name) = split_log_file(log_file);

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))
}

fn filter_unwanted_crates(env_filter: EnvFilter) -> Result<EnvFilter> {
    Ok(env_filter
        // Every statement is logged by sqlx at info
        .add_directive("sqlx::query=warn".parse()?)
        // Connection churn from the HTTP stack
        .add_directive("actix_server=info".parse()?)
        .add_directive("actix_http=info".parse()?)
        .add_directive("mio=off".parse()?))
}
