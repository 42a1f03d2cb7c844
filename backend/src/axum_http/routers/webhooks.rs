use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use boostline_core::{
    domain::repositories::{
        payments::PaymentRepository, subscriptions::SubscriptionRepository,
        users::UserRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{payments::PaymentPostgres, subscriptions::SubscriptionPostgres},
    },
    notifications::EmailSender,
    payments::{gateway::StripeGateway, stripe_client::StripeClient},
};
use serde::Serialize;
use tracing::warn;

use super::SharedActivator;
use crate::{
    axum_http::error_responses::AppError,
    config::stage::Stage,
    usecases::{errors::BillingError, webhook_processor::StripeWebhookProcessor},
};

const STRIPE_SIGNATURE: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct WebhookReceipt {
    pub received: bool,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe: Arc<StripeClient>,
    activator: SharedActivator,
) -> Router {
    let processor = StripeWebhookProcessor::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        stripe,
        activator,
    );

    Router::new()
        .route("/stripe", post(stripe_webhook))
        .with_state(Arc::new(processor))
}

/// Takes the body as raw bytes: the signature covers the exact payload.
pub async fn stripe_webhook<S, P, U, G, M>(
    State(processor): State<Arc<StripeWebhookProcessor<S, P, U, G, M>>>,
    Extension(stage): Extension<Stage>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    let Some(signature) = headers
        .get(STRIPE_SIGNATURE)
        .and_then(|value| value.to_str().ok())
    else {
        warn!("stripe_webhook: request without signature header");
        let err = BillingError::SignatureRejected("missing Stripe-Signature header".to_string());
        return AppError::new(err, stage).into_response();
    };

    match processor.handle(&body, signature).await {
        Ok(ack) => (
            StatusCode::OK,
            Json(WebhookReceipt {
                received: true,
                event_type: ack.event_type,
                error: ack.error,
            }),
        )
            .into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}
