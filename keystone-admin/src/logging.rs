use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. `RUST_LOG` overrides the default of
/// `keystone=info`. Calling this more than once is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keystone=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
