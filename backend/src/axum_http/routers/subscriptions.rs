use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use boostline_core::{
    domain::{
        repositories::{payments::PaymentRepository, subscriptions::SubscriptionRepository},
        value_objects::subscriptions::PaymentHistoryQuery,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{payments::PaymentPostgres, subscriptions::SubscriptionPostgres},
    },
    payments::{gateway::StripeGateway, stripe_client::StripeClient},
};

use crate::{
    auth::AuthUser, axum_http::error_responses::AppError, config::stage::Stage,
    usecases::subscriptions::SubscriptionUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe: Arc<StripeClient>) -> Router {
    let subscriptions_usecase = SubscriptionUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        stripe,
    );

    Router::new()
        .route("/current", get(current_subscription))
        .route("/cancel", post(cancel_subscription))
        .route("/payments", get(payment_history))
        .with_state(Arc::new(subscriptions_usecase))
}

pub async fn current_subscription<S, P, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, P, G>>>,
    Extension(stage): Extension<Stage>,
    auth: AuthUser,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    match subscriptions_usecase
        .get_current_subscription(auth.user_id)
        .await
    {
        Ok(current) => (StatusCode::OK, Json(current)).into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}

pub async fn cancel_subscription<S, P, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, P, G>>>,
    Extension(stage): Extension<Stage>,
    auth: AuthUser,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    match subscriptions_usecase.cancel_subscription(auth.user_id).await {
        Ok(cancelled) => (StatusCode::OK, Json(cancelled)).into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}

pub async fn payment_history<S, P, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, P, G>>>,
    Extension(stage): Extension<Stage>,
    auth: AuthUser,
    Query(query): Query<PaymentHistoryQuery>,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    match subscriptions_usecase.list_payments(auth.user_id, query).await {
        Ok(payments) => (StatusCode::OK, Json(payments)).into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}
