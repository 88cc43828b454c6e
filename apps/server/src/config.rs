use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use survarium_api::ApiDefaults;

pub struct Config {
    pub listen_addr: SocketAddr,
    /// Deployment name. Error details are hidden in `production`.
    pub env: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub static_dir: String,
    /// Client defaults (`SV_API_*`).
    pub api: ApiDefaults,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_raw = lookup("SV_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3005".to_string());
        let listen_addr: SocketAddr = listen_raw
            .parse()
            .with_context(|| format!("Invalid SV_LISTEN_ADDR: {}", listen_raw))?;
        let env = lookup("SV_ENV").unwrap_or_else(|| "development".into());
        let cors_allow = lookup("SV_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = lookup("SV_REQUEST_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(60_000);
        let static_dir = lookup("SV_STATIC_DIR").unwrap_or_else(|| "static".into());

        Ok(Self {
            listen_addr,
            env,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            static_dir,
            api: ApiDefaults::from_lookup(&lookup),
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}
