use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use headphone_tester_lib::audio::engine::CpalHost;
use headphone_tester_lib::audio::host::AudioHost;
use headphone_tester_lib::audio::selector::DeviceKind;
use headphone_tester_lib::cancel::{CancelToken, Interrupt};
use headphone_tester_lib::commands::help::HELP;
use headphone_tester_lib::commands::{logging, repl};
use headphone_tester_lib::config::TesterConfig;
use headphone_tester_lib::session::Session;

/// Interactive headphone and audio interface tester
#[derive(Parser, Debug)]
#[command(name = "headphone-tester", version, about)]
struct Cli {
    /// Pre-select USB audio devices
    #[arg(long, conflicts_with = "line")]
    usb: bool,

    /// Pre-select line (non-USB) devices
    #[arg(long)]
    line: bool,

    /// Settings file (JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn preselect(&self) -> Option<DeviceKind> {
        if self.usb {
            Some(DeviceKind::Usb)
        } else if self.line {
            Some(DeviceKind::Line)
        } else {
            None
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .clone()
        .map(|path| path.unwrap_or_else(logging::default_log_path));
    if let Err(e) = logging::init_logging(cli.verbose, log_file) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match TesterConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl+C stops the running operation, or ends the session at the prompt
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || match handler_token.interrupt() {
        Interrupt::Cancelled => log::debug!("Interrupt: cancelling running operation"),
        Interrupt::Idle => {
            println!();
            std::process::exit(0);
        }
    }) {
        eprintln!("Failed to install Ctrl+C handler: {}", e);
        return ExitCode::FAILURE;
    }

    let host = CpalHost::new(config.poll_interval());
    if let Err(e) = host.devices() {
        eprintln!("No audio subsystem available: {}", e);
        return ExitCode::FAILURE;
    }

    let mut session = Session::new(host, config, cancel);
    // Unlocked handle: the Ctrl+C handler may print while stdin is blocked
    let mut out = io::stdout();

    let result = (|| -> io::Result<()> {
        writeln!(out, "\n  === Headphone Tester ===")?;
        if let Some(kind) = cli.preselect() {
            if let Err(e) = session.select_by_type(kind, &mut out) {
                writeln!(out, "  Error: {}", e)?;
            }
        }
        write!(out, "{}", HELP)?;
        repl::run(&mut session, io::stdin().lock(), &mut out)
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Console I/O failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
