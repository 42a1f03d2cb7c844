use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use boostline_core::{
    domain::repositories::payments::PaymentRepository,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::payments::PaymentPostgres,
    },
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    auth::AuthUser, axum_http::error_responses::AppError, config::stage::Stage,
    usecases::dashboard::PaymentDashboardUseCase,
};

#[derive(Debug, Deserialize)]
pub struct PaymentSummaryQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let dashboard_usecase =
        PaymentDashboardUseCase::new(Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))));

    Router::new()
        .route("/payments/summary", get(payment_summary))
        .with_state(Arc::new(dashboard_usecase))
}

pub async fn payment_summary<P>(
    State(dashboard_usecase): State<Arc<PaymentDashboardUseCase<P>>>,
    Extension(stage): Extension<Stage>,
    _auth: AuthUser,
    Query(range): Query<PaymentSummaryQuery>,
) -> Response
where
    P: PaymentRepository + Send + Sync + 'static,
{
    match dashboard_usecase.payment_summary(range.from, range.to).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => AppError::new(err, stage).into_response(),
    }
}
