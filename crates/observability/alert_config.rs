use std::env;

use tracing::Level;
use url::Url;

/// Where an alert came from, stamped on every message.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AlertOrigin {
    pub(crate) service_name: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct DiscordAlertConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct AlertConfig {
    pub(crate) origin: AlertOrigin,
    pub(crate) discord: Option<DiscordAlertConfig>,
    /// Parsing problems, logged once the subscriber is installed.
    pub(crate) warnings: Vec<String>,
}

impl AlertConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(component: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let component = component.trim().to_string();
        let origin = AlertOrigin {
            service_name: value("SERVICE_NAME").unwrap_or_else(|| component.clone()),
            stage: value("STAGE").unwrap_or_else(|| "unknown".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let enabled = match value("ALERT_ENABLED") {
            None => true,
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warnings.push(format!("ALERT_ENABLED is invalid (value: {raw}); treating as enabled"));
                true
            }),
        };

        let webhook_url = match value("ALERT_DISCORD_WEBHOOK_URL") {
            Some(raw) if enabled => match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    // The raw URL embeds the webhook token; keep it out of logs.
                    warnings.push(format!(
                        "ALERT_DISCORD_WEBHOOK_URL is invalid; alerts disabled (parse error: {err})"
                    ));
                    None
                }
            },
            _ => None,
        };

        let discord = webhook_url.map(|webhook_url| {
            let min_level = match value("ALERT_LEVEL") {
                None => Level::ERROR,
                Some(raw) => parse_level(&raw).unwrap_or_else(|| {
                    warnings.push(format!(
                        "ALERT_LEVEL is invalid (value: {raw}); defaulting to ERROR"
                    ));
                    Level::ERROR
                }),
            };

            DiscordAlertConfig {
                webhook_url,
                min_level,
            }
        });

        Self {
            origin,
            discord,
            warnings,
        }
    }
}

pub(crate) fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
