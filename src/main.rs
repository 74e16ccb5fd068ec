#![deny(unused)]
//! prefixgate - `/{lang}/{clientApp}/` URL prefix normalization
//!
//! Fronts the add-ons site: every request is redirected to its canonical
//! prefix, handed off upstream, or passed through with the resolved lang and
//! client application attached.

use prefixgate_core::AppConfig;
use prefixgate_gateway::{GatewayConfig, GatewayServer, PathPrefixResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = AppConfig::load()?;

    // Initialize tracing
    prefixgate_governance::configure_tracing(app_config.logging.json_logs)?;

    tracing::info!("Starting prefixgate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        client_apps = ?app_config.prefix.valid_client_applications,
        default_client_app = %app_config.prefix.default_client_app,
        default_lang = %app_config.locale.default_lang,
        langs = app_config.locale.langs.len(),
        "Prefix configuration loaded"
    );

    let config = GatewayConfig::from(&app_config);
    let resolver = PathPrefixResolver::new(app_config.prefix, app_config.locale);
    let mut server = GatewayServer::new(config, resolver);

    if app_config.http.enable_metrics {
        let metrics_handle = prefixgate_governance::setup_metrics_recorder()?;
        server = server.with_metrics(metrics_handle);
    }

    server.run().await?;

    Ok(())
}
