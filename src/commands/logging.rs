use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "headphone-tester";

/// Default log file location (in the user's data directory)
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("logs")
        .join("headphone-tester.log")
}

/// Filter used when RUST_LOG is not set
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    // Create logs directory if it doesn't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize logging to stderr, or to `log_file` when given.
///
/// Returns the path actually logged to, if any.
pub fn init_logging(verbosity: u8, log_file: Option<PathBuf>) -> io::Result<Option<PathBuf>> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter(verbosity)));

    builder.format(|buf, record| {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(
            buf,
            "[{}] [{}] [{}] {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(path) = &log_file {
        let file = open_log_file(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().map_err(io::Error::other)?;

    // Write startup marker
    log::info!("headphone-tester started");
    if let Some(path) = &log_file {
        log::info!("Logging to {}", path.display());
    }
    Ok(log_file)
}
