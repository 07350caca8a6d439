//! Client configuration, read from the environment.

use std::env;
use std::time::Duration;

use tracing::warn;

pub const BASE_URL_VAR: &str = "USERS_API_URL";
pub const TIMEOUT_VAR: &str = "USERS_API_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Erro na requisição";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Whole-request timeout applied by the transport; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Message used when a failure carries nothing more specific.
    pub fallback_message: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }

    /// `USERS_API_URL` (default `http://localhost:3000`) and
    /// `USERS_API_TIMEOUT_SECS` (unset or unparsable means no timeout).
    pub fn from_env() -> Self {
        let base_url = env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url);

        if let Ok(raw) = env::var(TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Some(Duration::from_secs(secs)),
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid {TIMEOUT_VAR}"),
            }
        }

        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://api.local/");
        assert_eq!(config.base_url, "http://api.local");
    }

    #[test]
    fn from_env_defaults() {
        temp_env::with_vars_unset([BASE_URL_VAR, TIMEOUT_VAR], || {
            let config = ClientConfig::from_env();
            assert_eq!(config, ClientConfig::default());
            assert_eq!(config.fallback_message, "Erro na requisição");
        });
    }

    #[test]
    fn from_env_reads_url_and_timeout() {
        temp_env::with_vars(
            [(BASE_URL_VAR, Some("https://users.example.com/")), (TIMEOUT_VAR, Some("15"))],
            || {
                let config = ClientConfig::from_env();
                assert_eq!(config.base_url, "https://users.example.com");
                assert_eq!(config.timeout, Some(Duration::from_secs(15)));
            },
        );
    }

    #[test]
    fn from_env_ignores_bad_timeout() {
        temp_env::with_vars([(BASE_URL_VAR, None), (TIMEOUT_VAR, Some("soon"))], || {
            let config = ClientConfig::from_env();
            assert_eq!(config.timeout, None);
        });
    }
}
