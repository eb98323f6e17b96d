//! Log output for the CLI.
//!
//! Events go to stderr. On a terminal they are printed compactly above the package
//! spinners; anywhere else (CI, pipes) they are written as JSON lines and no spinner is
//! drawn. Failures reach the user through [`fatal!`](crate::fatal), after every
//! underlying problem has been logged against its package.

use std::io::IsTerminal;
use std::str::FromStr;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::style::ProgressStyle;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

use super::LogArgs;

//================================================================================================
// Macros
//================================================================================================

/// Logs the error ending a command, with its whole chain of causes.
#[macro_export]
macro_rules! fatal {
    ($error:expr) => {
        tracing::error!(fatal = true, "{:#}", $error)
    };
}

//================================================================================================
// Functions
//================================================================================================

/// Initializes the global tracing subscriber.
///
/// The returned guard flushes buffered JSON output when dropped, so it must live until
/// the command returns.
pub fn init_global_subscriber(args: LogArgs) -> WorkerGuard {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let level = level(args, rust_log.as_deref());
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    let interactive = std::io::stderr().is_terminal();

    let spinners = IndicatifLayer::new().with_progress_style(
        ProgressStyle::with_template("{spinner:.blue} {wide_msg}")
            .unwrap_or(ProgressStyle::default_spinner()),
    );

    let output = if interactive {
        fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(spinners.get_stderr_writer())
            .compact()
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_writer(non_blocking)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(output)
        .with(env_filter)
        .with(interactive.then_some(spinners))
        .init();

    tracing::trace!(%level, interactive, "logging initialized");
    guard
}

/// Runs `f` with every spinner hidden, so it can take over the terminal.
pub fn suspend<F: FnOnce() -> R, R>(f: F) -> R {
    tracing_indicatif::suspend_tracing_indicatif(f)
}

/// The most verbose level shown.
///
/// `--quiet` wins over everything, then a plain level in `RUST_LOG`, then `--verbosity`.
fn level(args: LogArgs, rust_log: Option<&str>) -> LevelFilter {
    match args.quiet {
        0 => {},
        1 => return LevelFilter::WARN,
        _ => return LevelFilter::ERROR,
    }
    if let Some(level) = rust_log.and_then(|l| LevelFilter::from_str(l).ok()) {
        return level;
    }
    match args.verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
