use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber once.
///
/// Honours `RUST_LOG`; defaults to `info` for the siren crates and
/// `warn` elsewhere. Safe to call twice (the second call is a no-op),
/// which keeps tests that spin up the server in-process from panicking.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,siren=info,siren_server=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
