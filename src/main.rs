//! Rig Veda Explorer server
//!
//! Entry point: loads configuration, initializes tracing and serves the app.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use veda_explorer::config::AppConfig;
use veda_explorer::server;

/// `info` unless `RUST_LOG` says otherwise; `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads env fallbacks.
    let _ = dotenv();

    init_tracing();

    let config = AppConfig::load().context("Configuration error")?;
    info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        rate_limit = config.resilience.rate_limit_enabled,
        timeout_disabled = config.resilience.timeout_disabled,
        "Configuration loaded"
    );

    server::start_server(Arc::new(config)).await
}
