use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use boostline_core::{
    domain::{
        repositories::{
            campaigns::CampaignRepository, checkout_locks::CheckoutLockRepository,
            payments::PaymentRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::{
            diagnostics::{ConfigPresence, Presence},
            subscriptions::CreateCheckoutSessionRequest,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            campaigns::CampaignPostgres, checkout_locks::CheckoutLockPostgres,
            payments::PaymentPostgres, plans::PlanPostgres, subscriptions::SubscriptionPostgres,
            users::UserPostgres,
        },
    },
    notifications::EmailSender,
    payments::{gateway::StripeGateway, stripe_client::StripeClient},
};
use chrono::Duration;

use super::SharedActivator;
use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    config::{config_model::DotEnvyConfig, stage::Stage},
    usecases::{
        checkout::{CheckoutSettings, CheckoutUseCase},
        checkout_result::CheckoutResultUseCase,
        diagnostics::DiagnosticsUseCase,
    },
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe: Arc<StripeClient>,
    activator: SharedActivator,
    config: Arc<DotEnvyConfig>,
) -> Router {
    let checkout_usecase = CheckoutUseCase::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(UserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CampaignPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CheckoutLockPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&stripe),
        CheckoutSettings {
            currency: config.stripe.currency.clone(),
            lock_ttl: Duration::seconds(config.checkout.lock_ttl_secs),
        },
    );
    let diagnostics_usecase = DiagnosticsUseCase::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CampaignPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&stripe),
        ConfigPresence {
            webhook_secret: Presence::of(&config.stripe.webhook_secret),
            stripe_key: Presence::of(&config.stripe.secret_key),
            frontend_url: config.stripe.frontend_url.clone(),
        },
    );
    let checkout_result_usecase = CheckoutResultUseCase::new(stripe, activator);

    Router::new()
        .route("/checkout-sessions", post(create_checkout_session))
        .with_state(Arc::new(checkout_usecase))
        .merge(
            Router::new()
                .route("/checkout-sessions/:session_id", get(checkout_result))
                .with_state(Arc::new(checkout_result_usecase)),
        )
        .merge(
            Router::new()
                .route("/diagnostics", get(diagnostics))
                .with_state(Arc::new(diagnostics_usecase)),
        )
}

pub async fn create_checkout_session<P, U, C, S, L, G>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<P, U, C, S, L, G>>>,
    Extension(stage): Extension<Stage>,
    auth: AuthUser,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    C: CampaignRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    L: CheckoutLockRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    match checkout_usecase
        .create_checkout_session(auth.user_id, request)
        .await
    {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}

pub async fn checkout_result<S, U, G, M>(
    State(checkout_result_usecase): State<Arc<CheckoutResultUseCase<S, U, G, M>>>,
    Extension(stage): Extension<Stage>,
    auth: AuthUser,
    Path(session_id): Path<String>,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    match checkout_result_usecase
        .checkout_result(auth.user_id, &session_id)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}

pub async fn diagnostics<L, S, P, C, G>(
    State(diagnostics_usecase): State<Arc<DiagnosticsUseCase<L, S, P, C, G>>>,
    Extension(stage): Extension<Stage>,
    _auth: AuthUser,
) -> Response
where
    L: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    C: CampaignRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    match diagnostics_usecase.diagnose().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}
