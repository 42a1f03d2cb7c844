use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::dispatcher::{AlertRecord, AlertSink};

const DISCORD_CONTENT_LIMIT: usize = 2000;
const TRUNCATION_SUFFIX: &str = "\n... (truncated)";

pub(crate) struct DiscordAlertSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordAlertSink {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("failed to build discord http client")?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

pub(crate) fn render(record: &AlertRecord) -> String {
    let mut lines = vec![format!(
        "**{}** `{}` `{}` `{}`",
        record.origin.service_name,
        record.origin.stage,
        record.origin.component,
        record.level.as_str()
    )];

    let location = record
        .location
        .as_ref()
        .map(|location| format!(" `{location}`"))
        .unwrap_or_default();
    lines.push(format!(
        "`{}` `{}`{location}",
        record.at.to_rfc3339_opts(SecondsFormat::Secs, true),
        record.target,
    ));

    if let Some(message) = record.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }

    if !record.span_path.is_empty() {
        lines.push(format!("spans: `{}`", record.span_path.join(" > ")));
    }

    for (key, value) in &record.fields {
        lines.push(format!("- `{key}` = `{value}`"));
    }

    truncate(lines.join("\n"), DISCORD_CONTENT_LIMIT)
}

pub(crate) fn truncate(content: String, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content;
    }

    let keep = limit.saturating_sub(TRUNCATION_SUFFIX.chars().count());
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

#[async_trait]
impl AlertSink for DiscordAlertSink {
    async fn deliver(&self, record: &AlertRecord) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render(record) }))
            .send()
            .await
            // reqwest errors carry the URL, which embeds the webhook token.
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "discord webhook returned status {}",
                response.status()
            ));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
