use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// Logs go to stderr, so command output on stdout stays clean. With a
/// `log_dir`, a daily-rolling plain-text copy is written there as well.
pub fn init(log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let mut guard_lost = false;
    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("cannot create log directory {}: {e}", dir.display());
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(dir, "lexsearch.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        guard_lost = !keep_guard(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if guard_lost {
        tracing::warn!("log file writer already installed, file logging may stop early");
    }
}

/// Hold the file writer's guard for the rest of the process.
///
/// Returns `false` if a guard was already held; the new one is dropped.
fn keep_guard(guard: WorkerGuard) -> bool {
    LOG_GUARD.set(guard).is_ok()
}
