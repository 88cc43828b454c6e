//! Client configuration.
//!
//! Settings resolve in this order, first match wins:
//! 1. [`CallOptions`] passed to a single call
//! 2. [`ClientOptions`] given to [`SurvariumClient`](crate::SurvariumClient)
//! 3. [`ApiDefaults`], read from `SV_API_*` environment variables

use std::time::Duration;

/// Default API address.
pub const DEFAULT_API_URL: &str = "http://api.survarium.com/";

/// Default public and private key of the public test account.
pub const DEFAULT_KEY: &str = "test";

/// Default number of retries per request.
pub const DEFAULT_RETRIES: u32 = 10;

/// Default lower bound of random delays, in milliseconds.
pub const DEFAULT_DELAY_MIN_MS: u64 = 20;

/// Default upper bound of random delays, in milliseconds.
pub const DEFAULT_DELAY_MAX_MS: u64 = 200;

/// Default cap of the randomized backoff span, in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

/// Default pause between two stack dispatches, in milliseconds.
pub const DEFAULT_STACK_PAUSE_MS: u64 = 20;

/// Timeout of a single HTTP attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// User agent sent with every request.
pub const USER_AGENT: &str = "Survarium browser";

/// Process-wide defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiDefaults {
    pub retries: u32,
    pub stack_mode: bool,
    pub delay_mode: bool,
    /// Prefix the dump file name is appended to. Dumps are off when `None`.
    pub save_source: Option<String>,
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub stack_pause: Duration,
    pub key_pub: String,
    pub key_priv: String,
    pub api_url: String,
}

impl Default for ApiDefaults {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            stack_mode: false,
            delay_mode: false,
            save_source: None,
            delay_min: Duration::from_millis(DEFAULT_DELAY_MIN_MS),
            delay_max: Duration::from_millis(DEFAULT_DELAY_MAX_MS),
            stack_pause: Duration::from_millis(DEFAULT_STACK_PAUSE_MS),
            key_pub: DEFAULT_KEY.to_string(),
            key_priv: DEFAULT_KEY.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl ApiDefaults {
    /// Read defaults from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read defaults through `lookup`. Unset or unparsable numbers keep their
    /// default; flags are on for any non-empty value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let number = |key: &str| text(key).and_then(|v| v.trim().parse::<u64>().ok());
        let millis = |key: &str, fallback: Duration| {
            number(key).map(Duration::from_millis).unwrap_or(fallback)
        };

        Self {
            retries: number("SV_API_RETRIES")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.retries),
            stack_mode: text("SV_API_STACK_MODE").is_some(),
            delay_mode: text("SV_API_DELAY_MODE").is_some(),
            save_source: text("SV_API_SAVE_SOURCE"),
            delay_min: millis("SV_API_DELAY_MIN", defaults.delay_min),
            delay_max: millis("SV_API_DELAY_MAX", defaults.delay_max),
            stack_pause: millis("SV_API_STACK_PAUSE", defaults.stack_pause),
            key_pub: text("SV_API_PUBKEY").unwrap_or(defaults.key_pub),
            key_priv: text("SV_API_PRIVKEY").unwrap_or(defaults.key_priv),
            api_url: text("SV_API").unwrap_or(defaults.api_url),
        }
    }
}

/// API key pair and address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub key_pub: Option<String>,
    pub key_priv: Option<String>,
    pub api_url: Option<String>,
}

impl Credentials {
    pub fn new(key_pub: impl Into<String>, key_priv: impl Into<String>) -> Self {
        Self {
            key_pub: Some(key_pub.into()),
            key_priv: Some(key_priv.into()),
            api_url: None,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }
}

/// Per-client overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Retry ceiling for requests of this client.
    pub retries: Option<u32>,
    /// Pause between two stack dispatches.
    pub stack_pause: Option<Duration>,
}

/// Delay requested for a single call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delay {
    /// Wait exactly this long.
    Fixed(Duration),
    /// Wait a random time between the configured delay bounds.
    Auto,
}

/// Per-call overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Wait before executing. Takes precedence over stacking.
    pub delay: Option<Delay>,
    /// Run the call through the client's request stack.
    pub stack: bool,
    /// Dump the parsed response under this prefix.
    pub save_source: Option<String>,
    /// Retry ceiling for this call.
    pub retries: Option<u32>,
}

impl CallOptions {
    pub fn stacked() -> Self {
        Self {
            stack: true,
            ..Self::default()
        }
    }

    pub fn delayed(delay: Delay) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_save_source(mut self, prefix: impl Into<String>) -> Self {
        self.save_source = Some(prefix.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let defaults = ApiDefaults::from_lookup(lookup(&[]));
        assert_eq!(defaults, ApiDefaults::default());
        assert_eq!(defaults.retries, 10);
        assert_eq!(defaults.stack_pause, Duration::from_millis(20));
        assert_eq!(defaults.delay_min, Duration::from_millis(20));
        assert_eq!(defaults.delay_max, Duration::from_millis(200));
        assert_eq!(defaults.api_url, "http://api.survarium.com/");
        assert!(!defaults.stack_mode);
        assert!(defaults.save_source.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let defaults = ApiDefaults::from_lookup(lookup(&[
            ("SV_API_RETRIES", "3"),
            ("SV_API_STACK_MODE", "1"),
            ("SV_API_DELAY_MODE", ""),
            ("SV_API_SAVE_SOURCE", "/tmp/dumps/"),
            ("SV_API_DELAY_MIN", "5"),
            ("SV_API_DELAY_MAX", "50"),
            ("SV_API_STACK_PAUSE", "100"),
            ("SV_API_PUBKEY", "pub"),
            ("SV_API_PRIVKEY", "priv"),
            ("SV_API", "http://localhost:9000/"),
        ]));
        assert_eq!(defaults.retries, 3);
        assert!(defaults.stack_mode);
        assert!(!defaults.delay_mode);
        assert_eq!(defaults.save_source.as_deref(), Some("/tmp/dumps/"));
        assert_eq!(defaults.delay_min, Duration::from_millis(5));
        assert_eq!(defaults.delay_max, Duration::from_millis(50));
        assert_eq!(defaults.stack_pause, Duration::from_millis(100));
        assert_eq!(defaults.key_pub, "pub");
        assert_eq!(defaults.key_priv, "priv");
        assert_eq!(defaults.api_url, "http://localhost:9000/");
    }

    #[test]
    fn test_unparsable_numbers_keep_defaults() {
        let defaults = ApiDefaults::from_lookup(lookup(&[
            ("SV_API_RETRIES", "many"),
            ("SV_API_DELAY_MIN", "-1"),
        ]));
        assert_eq!(defaults.retries, DEFAULT_RETRIES);
        assert_eq!(defaults.delay_min, Duration::from_millis(DEFAULT_DELAY_MIN_MS));
    }

    #[test]
    fn test_zero_retries_is_kept() {
        let defaults = ApiDefaults::from_lookup(lookup(&[("SV_API_RETRIES", "0")]));
        assert_eq!(defaults.retries, 0);
    }
}
