use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "AGENT_CHAT_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Installs the stderr fmt subscriber. Stdout is reserved for the
/// conversation. Calling this more than once is a no-op.
pub fn init() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
