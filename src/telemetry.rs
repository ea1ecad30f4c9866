use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Honors `RUST_LOG`, defaulting to `info`.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .try_init();
}
