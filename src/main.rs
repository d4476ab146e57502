//! debroot binary entrypoint kept minimal. The pipeline lives in `args::run`.

mod args;

use clap::Parser;
use std::fmt;
use std::process::ExitCode;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::util::SubscriberInitExt;

struct DebrootTimer;

impl tracing_subscriber::fmt::time::FormatTime for DebrootTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let ts = chrono::Local::now().format("%Y-%m-%d-T %H:%M:%S").to_string();
        w.write_str(&ts)
    }
}

/// What: Build the log subscriber writing to `writer`.
///
/// Inputs:
/// - `level`: Default filter when `RUST_LOG` is unset or invalid.
/// - `writer`: Non-blocking sink for formatted events.
fn subscriber(level: &str, writer: NonBlocking) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(writer)
        .with_timer(DebrootTimer)
        .finish()
}

/// What: Install the stderr logger.
///
/// Output:
/// - Guard of the non-blocking writer; queued lines are flushed when it drops.
fn init_logging(level: &str) -> WorkerGuard {
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    subscriber(level, non_blocking).init();
    guard
}

/// Map a command exit code onto the process exit status; out-of-range codes become `1`.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn main() -> ExitCode {
    let args = args::Args::parse();
    let _log_guard = init_logging(&args::determine_log_level(&args));
    tracing::debug!(?args, "debroot starting");

    let code = match args::run::handle_run(&args) {
        Ok(code) => {
            tracing::info!(code, "debroot exited");
            code
        }
        Err(err) => {
            tracing::error!(error = %err, "debroot failed");
            eprintln!("debroot: {err}");
            1
        }
    };
    ExitCode::from(exit_status(code))
}
