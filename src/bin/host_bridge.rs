//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! This binary reads `CommandEnvelope` messages as newline-delimited JSON
//! from stdin, dispatches them through the moodflow command router, and
//! writes `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.
//!
//! Usage: `moodflow-host [CONFIG_PATH]`. Without a path the default config
//! location is used when it exists, otherwise built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;

use moodflow::MoodFlowConfig;
use moodflow::host::router::{MoodFlowServices, ServiceParts};
use moodflow::host::stdio::run_stdio_bridge;
use moodflow::language::HttpGeoLookup;
use moodflow_geo::{GeoConfig, GeoLocator};

fn load_config() -> anyhow::Result<MoodFlowConfig> {
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(MoodFlowConfig::default_config_path);

    let config = if explicit.is_some() || path.exists() {
        tracing::info!(path = %path.display(), "loading config");
        MoodFlowConfig::from_file(&path)
            .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", path.display()))?
    } else {
        tracing::info!("no config file found; using defaults");
        MoodFlowConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn build_parts(config: &MoodFlowConfig) -> ServiceParts {
    let parts = ServiceParts::in_memory(config);
    if !config.language.geo_enabled {
        return parts;
    }

    let geo_config = GeoConfig {
        timeout_seconds: config.language.geo_timeout_ms.div_ceil(1000).max(1),
        ..GeoConfig::default()
    };
    match GeoLocator::new(geo_config) {
        Ok(locator) => parts.with_geo(Arc::new(HttpGeoLookup::new(locator))),
        Err(e) => {
            tracing::warn!(error = %e, "geolocation disabled: locator unavailable");
            parts
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("moodflow=info,moodflow_geo=info")
            }),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "moodflow-host starting");

    let config = load_config()?;
    let parts = build_parts(&config);
    let services = Arc::new(MoodFlowServices::new(config, parts));

    run_stdio_bridge(services).await.map_err(|e| {
        tracing::error!(error = %e, "moodflow-host exited with error");
        anyhow::anyhow!("moodflow-host failed: {e}")
    })?;

    tracing::info!("moodflow-host shut down cleanly");
    Ok(())
}
