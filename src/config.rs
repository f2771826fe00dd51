use crate::api::routes::HEALTH_PATH;
use crate::error::{ChatError, Result};
use crate::history::MAX_HISTORY;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat server configuration
    pub server: ServerConfig,
    /// Relay behaviour
    pub relay: RelayConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the chat server (default: 3000)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Path of the WebSocket endpoint (default: /ws)
    pub ws_path: String,
    /// Accept clients speaking the legacy `chat.v1` framing
    pub allow_legacy_protocol: bool,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Number of messages replayed to new clients
    pub history_size: usize,
    /// Fallback delay before history is pushed to a client that never
    /// sent `client_ready`
    pub history_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            history_size: MAX_HISTORY,
            history_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let ws_path = get_env_or("CHAT_WS_PATH", "/ws");
        validate_ws_path(&ws_path)?;

        let history_size: usize = get_env_or("CHAT_HISTORY_SIZE", "50").parse().map_err(|_| {
            ChatError::InvalidConfig("CHAT_HISTORY_SIZE must be a valid number".into())
        })?;
        if history_size == 0 {
            return Err(ChatError::InvalidConfig(
                "CHAT_HISTORY_SIZE must be at least 1".into(),
            ));
        }

        Ok(Config {
            server: ServerConfig {
                port: get_env_or("CHAT_PORT", "3000").parse().map_err(|_| {
                    ChatError::InvalidConfig("CHAT_PORT must be a valid port number".into())
                })?,
                host: get_env_or("CHAT_HOST", "0.0.0.0"),
                ws_path,
                allow_legacy_protocol: get_env_or("CHAT_ALLOW_LEGACY_PROTOCOL", "true")
                    .parse()
                    .map_err(|_| {
                        ChatError::InvalidConfig(
                            "CHAT_ALLOW_LEGACY_PROTOCOL must be true or false".into(),
                        )
                    })?,
            },
            relay: RelayConfig {
                history_size,
                history_delay: Duration::from_millis(
                    get_env_or("CHAT_HISTORY_DELAY_MS", "1000")
                        .parse()
                        .map_err(|_| {
                            ChatError::InvalidConfig(
                                "CHAT_HISTORY_DELAY_MS must be a valid number".into(),
                            )
                        })?,
                ),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the chat server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// The WebSocket path must be a literal route that doesn't shadow `/health`
fn validate_ws_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(ChatError::InvalidConfig(
            "CHAT_WS_PATH must start with '/'".into(),
        ));
    }
    if path == HEALTH_PATH {
        return Err(ChatError::InvalidConfig(format!(
            "CHAT_WS_PATH must not be {}",
            HEALTH_PATH
        )));
    }
    if path.contains([':', '*', '{', '}']) {
        return Err(ChatError::InvalidConfig(
            "CHAT_WS_PATH must not contain route parameters (':', '*', '{', '}')".into(),
        ));
    }
    Ok(())
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "CHAT_HOST",
        "CHAT_PORT",
        "CHAT_WS_PATH",
        "CHAT_HISTORY_SIZE",
        "CHAT_HISTORY_DELAY_MS",
        "CHAT_ALLOW_LEGACY_PROTOCOL",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env().unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.ws_path, "/ws");
        assert!(config.server.allow_legacy_protocol);
        assert_eq!(config.relay.history_size, 50);
        assert_eq!(config.relay.history_delay, Duration::from_secs(1));
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "pretty");
        assert_eq!(config.server_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("CHAT_HOST", "127.0.0.1");
        env::set_var("CHAT_PORT", "4000");
        env::set_var("CHAT_WS_PATH", "/chat");
        env::set_var("CHAT_HISTORY_SIZE", "10");
        env::set_var("CHAT_HISTORY_DELAY_MS", "250");
        env::set_var("CHAT_ALLOW_LEGACY_PROTOCOL", "false");
        env::set_var("LOG_FORMAT", "json");

        let config = Config::from_env().unwrap();

        assert_eq!(config.server_addr(), "127.0.0.1:4000");
        assert_eq!(config.server.ws_path, "/chat");
        assert!(!config.server.allow_legacy_protocol);
        assert_eq!(config.relay.history_size, 10);
        assert_eq!(config.relay.history_delay, Duration::from_millis(250));
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_config_from_env_invalid_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        for (key, value) in [
            ("CHAT_PORT", "not-a-port"),
            ("CHAT_WS_PATH", "ws"),
            ("CHAT_WS_PATH", "/health"),
            ("CHAT_WS_PATH", "/:room"),
            ("CHAT_WS_PATH", "/*rest"),
            ("CHAT_WS_PATH", "/{room}"),
            ("CHAT_HISTORY_SIZE", "0"),
            ("CHAT_HISTORY_SIZE", "many"),
            ("CHAT_HISTORY_DELAY_MS", "-1"),
            ("CHAT_ALLOW_LEGACY_PROTOCOL", "maybe"),
        ] {
            env::set_var(key, value);
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ChatError::InvalidConfig(_)), "{}={}", key, value);
            env::remove_var(key);
        }
    }
}
