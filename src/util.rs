use tracing_subscriber::{fmt, EnvFilter};

/// Initialize dotenv and structured tracing based on RUST_LOG.
/// - Supports explicit env file paths via ENV_FILE or DOTENV_PATH
/// - Falls back to the default .env discovery
/// - Logs the source used
///
/// Safe to call more than once; only the first subscriber is installed.
pub fn init_tracing() {
    let mut env_source: String = "none".into();
    for key in ["ENV_FILE", "DOTENV_PATH"] {
        if let Some(p) = env_trimmed(key) {
            if std::path::Path::new(&p).is_file() && dotenvy::from_filename(&p).is_ok() {
                env_source = format!("{p} ({key})");
                break;
            }
        }
    }

    if env_source == "none" && dotenvy::dotenv().is_ok() {
        env_source = ".env".into();
    }

    // RUST_LOG may come from the env file loaded above
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::debug!("Environment loaded from: {}", env_source);
}

/// Read an environment variable, trimmed. Unset and blank values are `None`.
pub fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a boolean flag: 1|true|yes|on enable it, any other non-blank value disables it.
pub fn env_flag(key: &str) -> Option<bool> {
    env_trimmed(key).map(|v| {
        let v = v.to_ascii_lowercase();
        v == "1" || v == "true" || v == "yes" || v == "on"
    })
}
