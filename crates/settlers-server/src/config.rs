//! Server configuration loaded from environment variables.

use std::time::Duration;

use settlers_core::code::DEFAULT_MAX_ATTEMPTS;

/// Settings shared by the registry, the lobby and every coordinator.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of symbols in a session code.
    pub code_length: usize,

    /// Draws before code generation gives up with `AlphabetExhausted`.
    pub code_attempts: u32,

    /// Wait applied to outbound polls that do not name their own timeout.
    pub poll_timeout: Duration,

    /// Secret required to clear every session. Clearing is refused when unset.
    pub admin_secret: Option<String>,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads `SESSION_CODE_LENGTH`, `SESSION_CODE_ATTEMPTS`,
    /// `POLL_TIMEOUT_MS` and `ADMIN_SECRET`, falling back to the defaults
    /// for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let admin_secret = std::env::var("ADMIN_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        Self {
            code_length: parse_env("SESSION_CODE_LENGTH", defaults.code_length).max(1),
            code_attempts: parse_env("SESSION_CODE_ATTEMPTS", defaults.code_attempts),
            poll_timeout: Duration::from_millis(parse_env(
                "POLL_TIMEOUT_MS",
                defaults.poll_timeout.as_millis() as u64,
            )),
            admin_secret,
        }
    }

    /// Builder-style setter, mostly for tests.
    pub fn with_admin_secret(mut self, secret: impl Into<String>) -> Self {
        self.admin_secret = Some(secret.into());
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            code_length: 5,
            code_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_timeout: Duration::from_secs(25),
            admin_secret: None,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
