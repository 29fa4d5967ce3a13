//! Logging setup from the `[logging]` config section.
//!
//! One `fmt` layer is installed under an `EnvFilter`. The filter starts from
//! `logging.level` (or `RUST_LOG` when set) and adds one directive per entry
//! in `logging.filters`. Every dispatched interaction runs inside a
//! `dispatch` span, so `span_events = { new = true, close = true }` gives a
//! start line and a timed end line per interaction.
//!
//! ```toml
//! [logging]
//! level = "info"
//! output = "file"
//! file_path = "logs/rebus.log"
//!
//! [logging.filters]
//! rebus_framework = "debug"
//! ```

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber described by `config`.
///
/// A subscriber installed earlier (a test harness, an embedding binary) is
/// left in place.
pub fn init_from_config(config: &LoggingConfig) {
    if try_init(config).is_err() {
        debug!("Global subscriber already installed, keeping it");
    }
}

/// Installs the global subscriber, failing if one is already set.
pub fn try_init(config: &LoggingConfig) -> Result<(), TryInitError> {
    match config.output {
        LogOutput::Stdout => install(config, std::io::stdout),
        LogOutput::Stderr => install(config, std::io::stderr),
        LogOutput::File => match file_appender(config) {
            Some(appender) => install(config, appender),
            None => {
                let result = install(config, std::io::stderr);
                warn!("File output unavailable, logging to stderr");
                result
            }
        },
    }
}

fn install<W>(config: &LoggingConfig, writer: W) -> Result<(), TryInitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events(&config.span_events))
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    let layer: BoxedLayer = match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
        #[cfg(not(feature = "json-log"))]
        LogFormat::Json => layer.boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter(config))
        .try_init()?;

    if cfg!(not(feature = "json-log")) && config.format == LogFormat::Json {
        warn!("JSON logging needs the `json-log` feature, using the full format");
    }
    Ok(())
}

/// `module=level` directives from `logging.filters`.
fn directives(config: &LoggingConfig) -> Vec<String> {
    config
        .filters
        .iter()
        .map(|(module, level)| format!("{module}={level}"))
        .collect()
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    for directive in directives(config) {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("ignoring log filter `{directive}`: {e}"),
        }
    }
    filter
}

fn span_events(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// Daily-rotated appender for `logging.file_path`, keeping `max_files`.
fn file_appender(config: &LoggingConfig) -> Option<RollingFileAppender> {
    let path = config.file_path.as_deref()?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .unwrap_or_else(|| OsStr::new("rebus.log"))
        .to_string_lossy()
        .into_owned();

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(config.max_files.max(1) as usize)
        .build(dir)
        .map_err(|e| eprintln!("failed to open log file {}: {e}", path.display()))
        .ok()
}
