use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use super::config::LoggingConfig;

/// Builds the `tracing_subscriber` registry (§ AMBIENT STACK DETAIL): an `EnvFilter` (default
/// `info`, overridable via `RUST_LOG`), an ANSI fmt layer on stdout, and — when
/// `logging.enabled` — a non-blocking rolling file layer via `tracing-appender`, mirroring the
/// teacher's `main.rs` setup minus its VictoriaLogs HTTP-shipping layer.
///
/// Returns the file-appender guard; dropping it flushes the background writer, so the caller
/// must keep it alive for the process lifetime.
pub fn init(config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let fmt_layer = fmt::layer().with_target(true).with_ansi(config.format != "json");

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if config.enabled {
        let file_appender = tracing_appender::rolling::daily(&config.directory, "mt5-copier.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
        registry.with(file_layer).init();
        Some(guard)
    } else {
        registry.init();
        None
    }
}
