use std::env;

use anyhow::{Context, Result, anyhow};

use super::{
    config_model::{Auth, BackendServer, Checkout, Database, DotEnvyConfig, Email, Stripe},
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| env::var(key).ok())
}

/// Builds the config from any key lookup; `load` uses the process environment.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let optional = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let required = |key: &str| optional(key).ok_or_else(|| anyhow!("{key} is not set"));

    let stage = match optional("STAGE") {
        Some(raw) => Stage::try_from(raw.as_str())?,
        None => Stage::default(),
    };

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: parse_or("SERVER_BODY_LIMIT", optional("SERVER_BODY_LIMIT"), 10)?,
        timeout: parse_or("SERVER_TIMEOUT", optional("SERVER_TIMEOUT"), 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: parse_or(
            "DATABASE_MAX_CONNECTIONS",
            optional("DATABASE_MAX_CONNECTIONS"),
            10,
        )?,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        currency: optional("STRIPE_CURRENCY")
            .map(|currency| currency.to_ascii_lowercase())
            .unwrap_or_else(|| "usd".to_string()),
        webhook_tolerance_secs: parse_or(
            "STRIPE_WEBHOOK_TOLERANCE_SECS",
            optional("STRIPE_WEBHOOK_TOLERANCE_SECS"),
            300,
        )?,
        frontend_url: required("FRONTEND_URL")?,
    };

    let email = Email {
        api_url: required("EMAIL_API_URL")?,
        api_key: required("EMAIL_API_KEY")?,
        from: required("EMAIL_FROM")?,
    };

    let auth = Auth {
        jwt_secret: required("JWT_SECRET")?,
    };

    let checkout = Checkout {
        lock_ttl_secs: parse_or(
            "CHECKOUT_LOCK_TTL_SECS",
            optional("CHECKOUT_LOCK_TTL_SECS"),
            120,
        )?,
    };

    Ok(DotEnvyConfig {
        stage,
        backend_server,
        database,
        stripe,
        email,
        auth,
        checkout,
    })
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}
