use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MediServer";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    "medi_server=info,tower_http=info".to_string()
}

/// Get the application data directory
/// ~/MediServer/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Default database file path
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("medi.db")
}

/// Default uploads directory (health-condition documents)
pub fn default_uploads_dir() -> PathBuf {
    app_data_dir().join("uploads")
}

/// Runtime configuration, loaded from `MEDI_*` environment variables
/// with sensible defaults for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address, e.g. "127.0.0.1" or "0.0.0.0"
    pub bind_addr: String,
    /// Listen port
    pub port: u16,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// Directory for uploaded health documents
    pub uploads_dir: PathBuf,
    /// Secret used to sign bearer tokens
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Chat-completions API base URL
    pub chatbot_base_url: String,
    /// Chat-completions API key (empty disables the proxy)
    pub chatbot_api_key: String,
    /// Model identifier sent to the chat-completions API
    pub chatbot_model: String,
}

/// Default token lifetime: 24 hours.
const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

impl ServerConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("MEDI_BIND_ADDR", "127.0.0.1"),
            port: std::env::var("MEDI_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            database_path: std::env::var("MEDI_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_database_path()),
            uploads_dir: std::env::var("MEDI_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_uploads_dir()),
            jwt_secret: env_or("MEDI_JWT_SECRET", "change-me-in-production"),
            token_ttl_secs: std::env::var("MEDI_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_TTL_SECS),
            chatbot_base_url: env_or("MEDI_CHATBOT_BASE_URL", "https://openrouter.ai/api/v1"),
            chatbot_api_key: env_or("MEDI_CHATBOT_API_KEY", ""),
            chatbot_model: env_or("MEDI_CHATBOT_MODEL", "openai/gpt-4o"),
        }
    }

    /// Configuration for tests: in-memory-friendly paths, fixed secret.
    #[cfg(test)]
    pub fn for_tests(uploads_dir: PathBuf) -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            database_path: PathBuf::from(":memory:"),
            uploads_dir,
            jwt_secret: "test-secret".to_string(),
            token_ttl_secs: 3600,
            chatbot_base_url: "http://localhost:0".to_string(),
            chatbot_api_key: String::new(),
            chatbot_model: "openai/gpt-4o".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("MediServer"));
    }

    #[test]
    fn default_database_under_app_data() {
        let db = default_database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("medi.db"));
    }

    #[test]
    fn default_uploads_under_app_data() {
        let uploads = default_uploads_dir();
        assert!(uploads.starts_with(app_data_dir()));
        assert!(uploads.ends_with("uploads"));
    }

    #[test]
    fn from_env_has_defaults() {
        let config = ServerConfig::from_env();
        assert!(!config.bind_addr.is_empty());
        assert!(config.port > 0);
        assert!(config.token_ttl_secs > 0);
        assert_eq!(config.chatbot_model, "openai/gpt-4o");
    }
}
