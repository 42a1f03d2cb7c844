mod alert_config;
mod alert_layer;
mod dispatcher;
mod discord_sink;

use std::sync::Arc;

use alert_config::AlertConfig;
use alert_layer::AlertLayer;
use anyhow::Result;
use discord_sink::DiscordAlertSink;
use dispatcher::AlertDispatcher;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber: RFC 3339 local-time formatting, `RUST_LOG`
/// filtering, and the optional Discord alert layer. Must run inside a tokio runtime.
pub fn init_observability(component: &str) -> Result<()> {
    let config = AlertConfig::from_env(component);

    let alert_layer = config.discord.as_ref().and_then(|discord| {
        let sink = DiscordAlertSink::new(discord.webhook_url.clone()).ok()?;
        let dispatcher = AlertDispatcher::spawn(vec![Arc::new(sink)]);

        Some(
            AlertLayer::new(dispatcher, config.origin.clone(), discord.min_level)
                .with_filter(LevelFilter::from_level(discord.min_level)),
        )
    });
    let alerts_enabled = alert_layer.is_some();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.origin.service_name,
            stage = %config.origin.stage,
            warning = %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %config.origin.service_name,
        stage = %config.origin.stage,
        component = %config.origin.component,
        alerts_enabled,
        "observability: initialized"
    );

    Ok(())
}
