//! Set-up of the program logger.
//!
//! Messages go to the terminal (colourised when it is a terminal) and, for model runs, to two log
//! files in the output folder: one for ordinary progress messages and one for warnings and errors.
use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Environment variable which overrides the log level in `settings.toml`
pub const LOG_LEVEL_ENV_VAR: &str = "FREIGHTPATH_LOG_LEVEL";

/// Log level used if none is given in the environment or in `settings.toml`
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log file for info and debug messages
const LOG_INFO_FILE_NAME: &str = "freightpath_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "freightpath_error.log";

/// Whether [`init`] has already been called successfully
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a log level name (`off`, `error`, `warn`, `info`, `debug` or `trace`)
fn parse_log_level(level: &str) -> Result<LevelFilter> {
    level
        .trim()
        .parse()
        .ok()
        .with_context(|| format!("Unknown log level: {level}"))
}

/// Install the program logger.
///
/// The level comes from the `FREIGHTPATH_LOG_LEVEL` environment variable if set, otherwise from
/// `settings.toml`, otherwise it is `info`.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level given in `settings.toml`, if any
/// * `log_file_path`: Folder in which to create the log files. No log files are written if `None`.
pub fn init(log_level_from_settings: Option<&str>, log_file_path: Option<&Path>) -> Result<()> {
    let log_level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => level,
        Err(_) => log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string(),
    };
    let log_level = parse_log_level(&log_level)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let colour_stdout = std::io::stdout().is_terminal();
    let colour_stderr = std::io::stderr().is_terminal();

    let mut dispatch = Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stdout, &colours);
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stderr, &colours);
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(log_file_path) = log_file_path {
        let create = |file_name: &str| {
            let path = log_file_path.join(file_name);
            File::create(&path)
                .with_context(|| format!("Could not create log file {}", path.display()))
        };

        // The info log always records at least info-level messages, whatever the terminal shows
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(create(LOG_INFO_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(create(LOG_ERROR_FILE_NAME)?),
            );
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");
    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log_plain(out, message, record);
    }
}
