pub mod auth;
pub mod axum_http;
pub mod config;
pub mod usecases;

use std::sync::Arc;

use anyhow::Result;
use boostline_core::{
    infra::db::postgres::postgres_connection, notifications::http_email::HttpEmailSender,
    payments::stripe_client::StripeClient,
};
use tracing::info;

pub async fn run() -> Result<()> {
    let dotenvy_env = config::config_loader::load()?;
    info!(stage = %dotenvy_env.stage, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let stripe = StripeClient::new(
        dotenvy_env.stripe.secret_key.clone(),
        dotenvy_env.stripe.webhook_secret.clone(),
        dotenvy_env.stripe.webhook_tolerance_secs,
        dotenvy_env.stripe.success_url(),
        dotenvy_env.stripe.cancel_url(),
    )?;
    let mailer = HttpEmailSender::new(
        dotenvy_env.email.api_url.clone(),
        dotenvy_env.email.api_key.clone(),
        dotenvy_env.email.from.clone(),
    )?;

    axum_http::http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        Arc::new(stripe),
        Arc::new(mailer),
    )
    .await?;

    Ok(())
}
