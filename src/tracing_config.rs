use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with file and console logging
///
/// Two layers:
/// 1. Console (stdout): `RUST_LOG` if set, INFO and above otherwise
/// 2. File: DEBUG and above, rotated daily under `./logs`
///
/// **Important**: Must return WorkerGuard to keep the non-blocking file writer alive.
/// Without it, logs may not flush properly on shutdown.
pub fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    // review_catalog.log.2026-10-16, review_catalog.log.2026-10-17, ...
    let file_appender = rolling::daily("./logs", "review_catalog.log");

    // Background thread buffers the writes; the guard owns it
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug,sqlx=info"));

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Tracing initialized (console=RUST_LOG or INFO+, file=DEBUG+)");

    guard
}
