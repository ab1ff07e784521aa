/// Initialize tracing/logging for the application.
///
/// The library itself only emits `tracing` events; binaries and tests call
/// this to get them printed.
pub fn init(default_level: &str) {
    let lvl = match default_level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };

    // try_init: a second call keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(true)
        .try_init();
}
