//! Client configuration.
//!
//! Everything the library needs is passed in explicitly through these structs.
//! `from_env` is provided for binaries that want to load it once at startup.

use std::time::Duration;

/// Default rooms API location, used when `TUNEMATES_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Poll interval while the matching job is running (2 seconds).
pub const IN_PROGRESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Poll interval while the room waits for members or for the job to start (6 seconds).
pub const WAITING_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// Connection settings for the rooms API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the rooms API (default: "http://localhost:8080")
    pub base_url: String,
    /// Send and store the session cookie with every request (default: true)
    pub with_credentials: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            with_credentials: true,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// `TUNEMATES_API_URL` sets the base URL. `TUNEMATES_WITH_CREDENTIALS`
    /// disables the cookie jar when set to `0` or `false`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TUNEMATES_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            with_credentials: std::env::var("TUNEMATES_WITH_CREDENTIALS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Polling cadence of a [`RoomSyncController`](crate::sync::RoomSyncController).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Delay between polls while the job is running, also used after a failed poll.
    pub in_progress_interval: Duration,
    /// Delay between polls while no job exists and the room is still open.
    pub waiting_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            in_progress_interval: IN_PROGRESS_POLL_INTERVAL,
            waiting_interval: WAITING_POLL_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(config.with_credentials);

        let sync = SyncConfig::default();
        assert_eq!(sync.in_progress_interval, Duration::from_secs(2));
        assert_eq!(sync.waiting_interval, Duration::from_secs(6));
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(" False "));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn builder_style() {
        let config = ClientConfig::new("https://api.example.com").with_credentials(false);
        assert_eq!(config.base_url, "https://api.example.com");
        assert!(!config.with_credentials);
    }
}
