use std::sync::Arc;

use survarium_api::{ClientOptions, Credentials, SurvariumClient};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub client: SurvariumClient,
    /// Expose error chains in responses.
    pub detailed_errors: bool,
}

pub fn init_tracing() {
    let log_format = std::env::var("SV_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let client = SurvariumClient::with_defaults(
        Credentials::default(),
        ClientOptions::default(),
        config.api.clone(),
    );
    tracing::info!(
        "Proxying {} (retries: {}, stack mode: {}, delay mode: {})",
        client.api_url(),
        config.api.retries,
        config.api.stack_mode,
        config.api.delay_mode
    );

    Ok(Arc::new(AppState {
        client,
        detailed_errors: !config.is_production(),
    }))
}
