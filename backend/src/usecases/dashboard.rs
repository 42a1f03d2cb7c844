use std::sync::Arc;

use boostline_core::domain::{
    repositories::payments::PaymentRepository,
    value_objects::subscriptions::PaymentStatusSummary,
};
use chrono::{DateTime, Utc};
use tracing::{error, info};

use super::errors::{BillingError, UseCaseResult};

pub struct PaymentDashboardUseCase<P>
where
    P: PaymentRepository + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
}

impl<P> PaymentDashboardUseCase<P>
where
    P: PaymentRepository + Send + Sync + 'static,
{
    pub fn new(payment_repo: Arc<P>) -> Self {
        Self { payment_repo }
    }

    /// Per-status totals for payments created in `[from, to)`.
    pub async fn payment_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> UseCaseResult<Vec<PaymentStatusSummary>> {
        if from >= to {
            return Err(BillingError::Validation {
                message: "`from` must be earlier than `to`".to_string(),
                detail: Some(format!("from={from}, to={to}")),
            });
        }

        let summary = self
            .payment_repo
            .summarize_by_status(from, to)
            .await
            .map_err(|err| {
                error!(%from, %to, db_error = ?err, "dashboard: failed to summarize payments");
                BillingError::Internal(err)
            })?;
        info!(%from, %to, statuses = summary.len(), "dashboard: payment summary loaded");

        Ok(summary)
    }
}
