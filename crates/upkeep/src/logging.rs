#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};
use std::fs::OpenOptions;
use std::path::Path;
use upkeep_platform::AppPaths;

use crate::settings::UpdaterSettings;

fn trim_log_file_if_oversized(log_path: &Path, max_log_size: u64) {
    let Ok(metadata) = std::fs::metadata(log_path) else {
        return;
    };
    if metadata.len() <= max_log_size {
        return;
    }
    let Ok(contents) = std::fs::read(log_path) else {
        return;
    };

    let half = contents.len() / 2;
    let keep_from = contents[half..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(half, |pos| half + pos + 1);
    let _ = std::fs::write(log_path, &contents[keep_from..]);
}

/// Install the process-wide logger: the platform log file, plus the terminal
/// in debug builds. Does nothing if a logger is already installed.
pub fn init_logging(debug_enabled: bool, max_log_size: u64) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("upkeep")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        LevelFilter::Debug,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));

    let log_path = AppPaths::new().ok().and_then(|paths| {
        paths.ensure_dirs().ok()?;
        Some(paths.log_file())
    });
    if let Some(log_path) = &log_path {
        trim_log_file_if_oversized(log_path, max_log_size);
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(log_path) {
            loggers.push(WriteLogger::new(LevelFilter::Debug, config, file));
        }
    }

    if loggers.is_empty() || CombinedLogger::init(loggers).is_err() {
        return;
    }

    set_logging_enabled(debug_enabled);

    if let Some(log_path) = log_path.filter(|_| debug_enabled) {
        log::info!(
            "Debug logging initialized, log file: {}",
            log_path.display()
        );
    }
}

/// [`init_logging`] driven by the `debug_logging` and `max_log_size_bytes`
/// settings.
pub fn init_logging_from_settings(settings: &UpdaterSettings) {
    init_logging(settings.debug_logging, settings.max_log_size_bytes);
}

pub fn set_logging_enabled(enabled: bool) {
    log::set_max_level(max_level(enabled));
}

fn max_level(debug_enabled: bool) -> log::LevelFilter {
    if debug_enabled {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}
