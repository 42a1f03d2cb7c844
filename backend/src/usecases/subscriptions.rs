use std::sync::Arc;

use boostline_core::{
    domain::{
        repositories::{payments::PaymentRepository, subscriptions::SubscriptionRepository},
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            subscriptions::{
                CancelSubscriptionDto, CurrentSubscriptionDto, PaymentDto, PaymentHistoryDto,
                PaymentHistoryQuery,
            },
        },
    },
    payments::gateway::StripeGateway,
};
use chrono::{TimeZone, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{BillingError, UseCaseResult};

pub struct SubscriptionUseCase<S, P, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    subscription_repo: Arc<S>,
    payment_repo: Arc<P>,
    stripe: Arc<G>,
}

impl<S, P, G> SubscriptionUseCase<S, P, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    pub fn new(subscription_repo: Arc<S>, payment_repo: Arc<P>, stripe: Arc<G>) -> Self {
        Self {
            subscription_repo,
            payment_repo,
            stripe,
        }
    }

    pub async fn get_current_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<CurrentSubscriptionDto> {
        info!(%user_id, "subscriptions: loading current subscription for user");
        let (subscription, plan) = self
            .subscription_repo
            .find_active_with_plan_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load current subscription");
                BillingError::Internal(err)
            })?
            .ok_or_else(|| {
                info!(%user_id, "subscriptions: no active subscription");
                BillingError::SubscriptionNotFound
            })?;

        Ok(CurrentSubscriptionDto::new(subscription, plan))
    }

    /// Stops renewal at Stripe, then retires the local record.
    pub async fn cancel_subscription(&self, user_id: Uuid) -> UseCaseResult<CancelSubscriptionDto> {
        let subscription = self
            .subscription_repo
            .find_active_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load subscription for cancel");
                BillingError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "subscriptions: no active subscription to cancel");
                BillingError::SubscriptionNotFound
            })?;

        let mut access_until = subscription.next_billing_at;
        if let Some(provider_subscription_id) = subscription.provider_subscription_id.as_deref() {
            info!(%user_id, provider_subscription_id, "subscriptions: scheduling cancellation at Stripe");
            let updated = self
                .stripe
                .update_subscription(provider_subscription_id, true)
                .await
                .map_err(|err| {
                    error!(
                        %user_id,
                        provider_subscription_id,
                        error = ?err,
                        "subscriptions: stripe update subscription failed"
                    );
                    BillingError::Provider(err)
                })?;

            if let Some(end) = updated
                .period_end()
                .and_then(|end| Utc.timestamp_opt(end, 0).single())
            {
                access_until = Some(end);
            }
        } else {
            warn!(
                %user_id,
                subscription_id = %subscription.id,
                "subscriptions: subscription has no provider id; cancelling locally only"
            );
        }

        let changed = self
            .subscription_repo
            .mark_cancelled(subscription.id)
            .await
            .map_err(|err| {
                error!(%user_id, subscription_id = %subscription.id, db_error = ?err, "subscriptions: failed to cancel subscription");
                BillingError::Internal(err)
            })?;
        if !changed {
            warn!(%user_id, subscription_id = %subscription.id, "subscriptions: subscription was already inactive");
        }

        info!(%user_id, subscription_id = %subscription.id, "subscriptions: subscription cancelled");
        Ok(CancelSubscriptionDto {
            id: subscription.id,
            status: SubscriptionStatus::Cancelled,
            access_until,
        })
    }

    pub async fn list_payments(
        &self,
        user_id: Uuid,
        query: PaymentHistoryQuery,
    ) -> UseCaseResult<PaymentHistoryDto> {
        let window = query.window();

        let count = self
            .payment_repo
            .count_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to count payments");
                BillingError::Internal(err)
            })?;
        let payments = self
            .payment_repo
            .list_for_user(user_id, i64::from(window.limit), window.offset())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to list payments");
                BillingError::Internal(err)
            })?;

        Ok(PaymentHistoryDto {
            payments: payments.into_iter().map(PaymentDto::from).collect(),
            pagination: window.pagination(count),
        })
    }
}
