use std::sync::Arc;

use boostline_core::{
    domain::{
        entities::{
            payments::InsertPaymentEntity,
            subscriptions::{
                ActivationOutcome, CheckoutActivation, InsertSubscriptionEntity,
                SubscriptionEntity,
            },
        },
        repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
        value_objects::{
            checkout_metadata::CheckoutMetadata,
            enums::{
                billing_cycles::BillingCycle, payment_statuses::PaymentStatus,
                subscription_statuses::SubscriptionStatus,
            },
            money::{format_amount, from_minor_units, to_minor_units},
            subscriptions::{CheckoutResultDto, order_id_for},
        },
    },
    notifications::{EmailSender, templates::SubscriptionConfirmation},
    payments::{gateway::StripeGateway, stripe_types::StripeCheckoutSession},
};
use chrono::{DateTime, Months, TimeZone, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{BillingError, UseCaseResult};

const PAYMENT_METHOD_CARD: &str = "card";

/// The local subscription a completed checkout maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedCheckout {
    pub subscription_id: Uuid,
    /// `false` when the provider subscription had already been recorded.
    pub newly_activated: bool,
    pub plan_name: String,
    pub amount_minor: i64,
    pub billing_cycle: BillingCycle,
}

impl MaterializedCheckout {
    fn from_existing(subscription: SubscriptionEntity) -> Self {
        Self {
            subscription_id: subscription.id,
            newly_activated: false,
            billing_cycle: subscription.billing_cycle(),
            amount_minor: subscription.amount_minor,
            plan_name: subscription.plan_name,
        }
    }

    pub fn order_id(&self) -> String {
        order_id_for(self.subscription_id)
    }

    pub fn into_result_dto(self) -> CheckoutResultDto {
        CheckoutResultDto {
            success: true,
            order_id: self.order_id(),
            plan_name: self.plan_name,
            amount: from_minor_units(self.amount_minor),
            billing_cycle: self.billing_cycle,
        }
    }
}

/// Turns a completed checkout session into ledger records. Shared by the webhook
/// and the synchronous checkout-result read so both go through the same gate.
pub struct CheckoutActivator<S, U, G, M>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    subscription_repo: Arc<S>,
    user_repo: Arc<U>,
    stripe: Arc<G>,
    mailer: Arc<M>,
    default_currency: String,
}

impl<S, U, G, M> CheckoutActivator<S, U, G, M>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        user_repo: Arc<U>,
        stripe: Arc<G>,
        mailer: Arc<M>,
        default_currency: String,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            stripe,
            mailer,
            default_currency,
        }
    }

    pub async fn materialize(
        &self,
        session: &StripeCheckoutSession,
    ) -> UseCaseResult<MaterializedCheckout> {
        let session_id = session.id.as_str();
        let metadata = CheckoutMetadata::from_map(&session.metadata).map_err(|err| {
            warn!(session_id, error = %err, "activation: unusable checkout metadata");
            BillingError::InvalidWebhook(err.to_string())
        })?;
        let user_id = metadata.user_id;

        let provider_subscription_id = session.subscription_id().ok_or_else(|| {
            warn!(session_id, %user_id, "activation: checkout session has no subscription");
            BillingError::InvalidWebhook("checkout session has no subscription".to_string())
        })?;

        let existing = self
            .subscription_repo
            .find_by_provider_subscription_id(provider_subscription_id)
            .await
            .map_err(|err| {
                error!(%user_id, provider_subscription_id, db_error = ?err, "activation: failed to look up subscription");
                BillingError::Internal(err)
            })?;
        if let Some(existing) = existing {
            info!(
                %user_id,
                provider_subscription_id,
                subscription_id = %existing.id,
                "activation: checkout already materialized"
            );
            return Ok(MaterializedCheckout::from_existing(existing));
        }

        if metadata.is_supersession {
            if let Some(superseded_id) = metadata.superseded_subscription_id {
                self.reconfirm_superseded(user_id, superseded_id).await;
            }
        }

        let now = Utc::now();
        let next_billing_at = self
            .next_billing_at(provider_subscription_id, metadata.billing_cycle, now)
            .await;
        let activation = self.build_activation(session, &metadata, provider_subscription_id, now, next_billing_at);
        let amount_minor = activation.subscription.amount_minor;
        let currency = activation.subscription.currency.clone();
        let plan_name = activation.subscription.plan_name.clone();

        let outcome = self
            .subscription_repo
            .activate_from_checkout(activation)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    campaign_id = %metadata.campaign_id,
                    plan_id = %metadata.plan_id,
                    provider_subscription_id,
                    session_id,
                    db_error = ?err,
                    "activation: failed to apply checkout activation"
                );
                BillingError::Internal(err)
            })?;

        match outcome {
            ActivationOutcome::Activated {
                subscription_id,
                payment_id,
                superseded,
            } => {
                info!(
                    %user_id,
                    %subscription_id,
                    %payment_id,
                    campaign_id = %metadata.campaign_id,
                    superseded_count = superseded.len(),
                    "activation: subscription activated"
                );
                self.cancel_superseded_at_provider(user_id, provider_subscription_id, &superseded)
                    .await;

                let materialized = MaterializedCheckout {
                    subscription_id,
                    newly_activated: true,
                    plan_name,
                    amount_minor,
                    billing_cycle: metadata.billing_cycle,
                };
                self.send_confirmation(user_id, &materialized, &currency).await;

                Ok(materialized)
            }
            ActivationOutcome::AlreadyActivated { subscription_id } => {
                info!(
                    %user_id,
                    %subscription_id,
                    provider_subscription_id,
                    "activation: concurrent delivery already materialized checkout"
                );
                Ok(MaterializedCheckout {
                    subscription_id,
                    newly_activated: false,
                    plan_name,
                    amount_minor,
                    billing_cycle: metadata.billing_cycle,
                })
            }
        }
    }

    fn build_activation(
        &self,
        session: &StripeCheckoutSession,
        metadata: &CheckoutMetadata,
        provider_subscription_id: &str,
        now: DateTime<Utc>,
        next_billing_at: DateTime<Utc>,
    ) -> CheckoutActivation {
        let amount_minor = to_minor_units(metadata.amount);
        let currency = session
            .currency
            .clone()
            .unwrap_or_else(|| self.default_currency.clone())
            .to_ascii_lowercase();
        let provider_customer_id = session.customer_id().map(str::to_string);

        CheckoutActivation {
            subscription: InsertSubscriptionEntity {
                user_id: metadata.user_id,
                plan_id: metadata.plan_id,
                campaign_id: Some(metadata.campaign_id),
                plan_name: metadata
                    .plan_name
                    .clone()
                    .unwrap_or_else(|| "Subscription".to_string()),
                amount_minor,
                currency: currency.clone(),
                billing_cycle: metadata.billing_cycle.to_string(),
                status: SubscriptionStatus::Active.to_string(),
                started_at: now,
                next_billing_at: Some(next_billing_at),
                provider_subscription_id: Some(provider_subscription_id.to_string()),
                provider_customer_id: provider_customer_id.clone(),
            },
            payment: InsertPaymentEntity {
                user_id: metadata.user_id,
                subscription_id: None,
                amount_minor: session.amount_total.unwrap_or(amount_minor),
                currency,
                status: PaymentStatus::Succeeded.to_string(),
                payment_method: PAYMENT_METHOD_CARD.to_string(),
                provider_payment_intent_id: session.payment_intent_id().map(str::to_string),
                provider_customer_id,
                provider_invoice_id: None,
                receipt_url: None,
            },
            campaign_id: metadata.campaign_id,
            activated_at: now,
        }
    }

    /// Period end reported by Stripe; falls back to one billing cycle from `now`.
    async fn next_billing_at(
        &self,
        provider_subscription_id: &str,
        billing_cycle: BillingCycle,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let reported = match self.stripe.retrieve_subscription(provider_subscription_id).await {
            Ok(subscription) => subscription
                .period_end()
                .and_then(|end| Utc.timestamp_opt(end, 0).single()),
            Err(err) => {
                warn!(
                    provider_subscription_id,
                    error = ?err,
                    "activation: failed to retrieve subscription; estimating next billing date"
                );
                None
            }
        };

        reported.unwrap_or_else(|| {
            let months = match billing_cycle {
                BillingCycle::Monthly => Months::new(1),
                BillingCycle::Annual => Months::new(12),
            };
            now.checked_add_months(months).unwrap_or(now)
        })
    }

    async fn reconfirm_superseded(&self, user_id: Uuid, superseded_id: Uuid) {
        let superseded = match self.subscription_repo.find_by_id(superseded_id).await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => return,
            Err(err) => {
                warn!(%user_id, %superseded_id, db_error = ?err, "activation: failed to load superseded subscription");
                return;
            }
        };

        if !superseded.is_active() {
            return;
        }

        if let Some(provider_id) = superseded.provider_subscription_id.as_deref() {
            if let Err(err) = self.stripe.cancel_subscription(provider_id).await {
                warn!(%user_id, %superseded_id, provider_id, error = ?err, "activation: failed to cancel superseded subscription at stripe");
            }
        }

        match self.subscription_repo.mark_cancelled(superseded_id).await {
            Ok(_) => info!(%user_id, %superseded_id, "activation: superseded subscription cancelled"),
            Err(err) => warn!(%user_id, %superseded_id, db_error = ?err, "activation: failed to cancel superseded subscription"),
        }
    }

    async fn cancel_superseded_at_provider(
        &self,
        user_id: Uuid,
        provider_subscription_id: &str,
        superseded: &[SubscriptionEntity],
    ) {
        for subscription in superseded {
            let Some(provider_id) = subscription.provider_subscription_id.as_deref() else {
                continue;
            };
            if provider_id == provider_subscription_id {
                continue;
            }

            if let Err(err) = self.stripe.cancel_subscription(provider_id).await {
                warn!(
                    %user_id,
                    superseded_id = %subscription.id,
                    provider_id,
                    error = ?err,
                    "activation: failed to cancel retired subscription at stripe"
                );
            }
        }
    }

    async fn send_confirmation(&self, user_id: Uuid, checkout: &MaterializedCheckout, currency: &str) {
        let user = match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(%user_id, "activation: no user record for confirmation email");
                return;
            }
            Err(err) => {
                warn!(%user_id, db_error = ?err, "activation: failed to load user for confirmation email");
                return;
            }
        };

        let confirmation = SubscriptionConfirmation {
            customer_name: user.full_name(),
            plan_name: checkout.plan_name.clone(),
            amount: format_amount(checkout.amount_minor, currency),
            billing_cycle: checkout.billing_cycle.label().to_string(),
            order_id: checkout.order_id(),
        };

        if let Err(err) = self
            .mailer
            .send(&user.email, &confirmation.subject(), &confirmation.render_html())
            .await
        {
            warn!(%user_id, error = ?err, "activation: confirmation email failed");
        }
    }
}
