//! Structured logging for the memory core.
//!
//! Uses `tracing` so allocator and collector diagnostics are zero-cost when
//! disabled and structured (not string-formatted) when enabled. The core
//! never initializes the subscriber itself (§6: "the core exposes [tunables]
//! as... setter calls rather than reading environment variables itself") —
//! `init()`/`init_with_output()` are a convenience for a host binary that
//! wants sensible defaults.

pub use tracing::{debug, error, info, trace, warn};

use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();
static GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Where formatted log lines go. Mirrors the teacher crate's
/// `LogConfig`/`LogOutput` split, trimmed to the two destinations an
/// embedded memory core plausibly needs.
pub enum LogOutput {
    /// Standard error, non-blocking (the default).
    Stderr,
    /// A daily-rotating file `<directory>/<prefix>.YYYY-MM-DD`.
    File { directory: String, prefix: String },
}

/// Install a `tracing-subscriber` `fmt` layer over [`LogOutput::Stderr`],
/// reading `RUBOLT_LOG` for the filter directive (e.g.
/// `RUBOLT_LOG=rubolt_memory::gc=trace`). Falls back to `info` in release
/// builds and `debug` in debug builds. Idempotent.
pub fn init() {
    init_with_output(LogOutput::Stderr);
}

/// Like [`init`] but lets a host embedder redirect diagnostics to a
/// rolling log file instead of stderr. Only the first call (across `init`
/// and `init_with_output`) has any effect; the worker thread's flush guard
/// is kept alive for the life of the process.
pub fn init_with_output(output: LogOutput) {
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_env("RUBOLT_LOG").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                EnvFilter::new("debug")
            } else {
                EnvFilter::new("info")
            }
        });

        let (writer, guard) = match output {
            LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
            LogOutput::File { directory, prefix } => {
                let appender = tracing_appender::rolling::daily(Path::new(&directory), &prefix);
                tracing_appender::non_blocking(appender)
            }
        };
        let _ = GUARD.set(guard);

        let _ = fmt().with_env_filter(filter).with_writer(writer).compact().try_init();
    });
}

/// True once [`init`]/[`init_with_output`] has run.
pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}
