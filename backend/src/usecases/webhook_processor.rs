use std::sync::Arc;

use boostline_core::{
    domain::{
        entities::{
            payments::{InsertPaymentEntity, RecordPaymentOutcome},
            subscriptions::SubscriptionEntity,
        },
        repositories::{
            payments::PaymentRepository, subscriptions::SubscriptionRepository,
            users::UserRepository,
        },
        value_objects::enums::payment_statuses::PaymentStatus,
    },
    notifications::EmailSender,
    payments::{
        errors::StripeError,
        gateway::StripeGateway,
        stripe_types::{
            CHECKOUT_SESSION_COMPLETED, INVOICE_PAID, INVOICE_PAYMENT_FAILED,
            INVOICE_PAYMENT_SUCCEEDED, StripeCheckoutSession, StripeEvent, StripeInvoice,
        },
    },
};
use chrono::{TimeZone, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    activation::CheckoutActivator,
    errors::{BillingError, UseCaseResult},
};

/// What an authenticated event did to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEffect {
    CheckoutActivated {
        subscription_id: Uuid,
        newly_activated: bool,
    },
    RenewalRecorded {
        subscription_id: Uuid,
        duplicate: bool,
        next_billing_advanced: bool,
    },
    PaymentFailureRecorded {
        subscription_id: Uuid,
        duplicate: bool,
    },
    UnknownSubscription,
    Skipped {
        reason: &'static str,
    },
    Ignored,
}

/// Acknowledgement returned to Stripe for every authenticated event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookAck {
    pub event_type: String,
    pub effect: Option<WebhookEffect>,
    /// Processing error that was logged and swallowed.
    pub error: Option<String>,
}

pub struct StripeWebhookProcessor<S, P, U, G, M>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    subscription_repo: Arc<S>,
    payment_repo: Arc<P>,
    stripe: Arc<G>,
    activator: Arc<CheckoutActivator<S, U, G, M>>,
}

impl<S, P, U, G, M> StripeWebhookProcessor<S, P, U, G, M>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        payment_repo: Arc<P>,
        stripe: Arc<G>,
        activator: Arc<CheckoutActivator<S, U, G, M>>,
    ) -> Self {
        Self {
            subscription_repo,
            payment_repo,
            stripe,
            activator,
        }
    }

    /// Verifies `payload` against the `Stripe-Signature` header and applies the event.
    ///
    /// Only authentication failures are returned as errors. Once the event is
    /// verified, processing failures are logged and reported inside the ack so the
    /// delivery is not retried.
    pub async fn handle(&self, payload: &[u8], signature_header: &str) -> UseCaseResult<WebhookAck> {
        let event = match self.stripe.construct_event(payload, signature_header) {
            Ok(event) => event,
            Err(StripeError::Signature(reason)) => {
                warn!(reason = %reason, "stripe_webhook: signature rejected");
                return Err(BillingError::SignatureRejected(reason));
            }
            Err(err) => {
                // Signature passed; a redelivery would fail the same way.
                let event_type = declared_event_type(payload);
                error!(
                    event_type = %event_type,
                    error = ?err,
                    "stripe_webhook: verified event could not be decoded; acknowledging"
                );
                return Ok(WebhookAck {
                    event_type,
                    effect: None,
                    error: Some(err.to_string()),
                });
            }
        };

        let event_id = event.id.clone().unwrap_or_default();
        info!(
            event_id = %event_id,
            event_type = %event.type_,
            livemode = event.livemode.unwrap_or(false),
            "stripe_webhook: event verified"
        );

        match self.dispatch(&event).await {
            Ok(effect) => {
                info!(event_id = %event_id, event_type = %event.type_, effect = ?effect, "stripe_webhook: event processed");
                Ok(WebhookAck {
                    event_type: event.type_,
                    effect: Some(effect),
                    error: None,
                })
            }
            Err(err) => {
                error!(
                    event_id = %event_id,
                    event_type = %event.type_,
                    error = ?err,
                    "stripe_webhook: processing failed; acknowledging to stop retries"
                );
                Ok(WebhookAck {
                    event_type: event.type_,
                    effect: None,
                    error: Some(err.to_string()),
                })
            }
        }
    }

    async fn dispatch(&self, event: &StripeEvent) -> UseCaseResult<WebhookEffect> {
        match event.type_.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                let session: StripeCheckoutSession = event
                    .object_as()
                    .map_err(|err| BillingError::InvalidWebhook(err.to_string()))?;
                let materialized = self.activator.materialize(&session).await?;
                Ok(WebhookEffect::CheckoutActivated {
                    subscription_id: materialized.subscription_id,
                    newly_activated: materialized.newly_activated,
                })
            }
            INVOICE_PAID | INVOICE_PAYMENT_SUCCEEDED => {
                let invoice: StripeInvoice = event
                    .object_as()
                    .map_err(|err| BillingError::InvalidWebhook(err.to_string()))?;
                self.apply_invoice_paid(&invoice).await
            }
            INVOICE_PAYMENT_FAILED => {
                let invoice: StripeInvoice = event
                    .object_as()
                    .map_err(|err| BillingError::InvalidWebhook(err.to_string()))?;
                self.apply_invoice_failed(&invoice).await
            }
            other => {
                info!(event_type = other, "stripe_webhook: unhandled event type");
                Ok(WebhookEffect::Ignored)
            }
        }
    }

    async fn apply_invoice_paid(&self, invoice: &StripeInvoice) -> UseCaseResult<WebhookEffect> {
        if invoice.is_subscription_create() {
            return Ok(WebhookEffect::Skipped {
                reason: "initial invoice is recorded at checkout",
            });
        }

        let Some(subscription) = self.find_invoice_subscription(invoice).await? else {
            return Ok(WebhookEffect::UnknownSubscription);
        };

        let amount_minor = invoice.amount_paid.unwrap_or(0);
        let outcome = self
            .record_invoice_payment(invoice, &subscription, PaymentStatus::Succeeded, amount_minor)
            .await?;

        let period_end = invoice
            .period_end()
            .and_then(|end| Utc.timestamp_opt(end, 0).single());
        let next_billing_advanced = match period_end {
            Some(next) if subscription.next_billing_at.is_none_or(|current| next > current) => {
                self.subscription_repo
                    .update_next_billing_at(subscription.id, next)
                    .await
                    .map_err(|err| {
                        error!(subscription_id = %subscription.id, db_error = ?err, "stripe_webhook: failed to advance next billing date");
                        BillingError::Internal(err)
                    })?;
                info!(subscription_id = %subscription.id, next_billing_at = %next, "stripe_webhook: next billing date advanced");
                true
            }
            Some(next) => {
                warn!(
                    subscription_id = %subscription.id,
                    invoice_period_end = %next,
                    "stripe_webhook: invoice period end is not later than stored next billing date"
                );
                false
            }
            None => false,
        };

        Ok(WebhookEffect::RenewalRecorded {
            subscription_id: subscription.id,
            duplicate: outcome == RecordPaymentOutcome::Duplicate,
            next_billing_advanced,
        })
    }

    async fn apply_invoice_failed(&self, invoice: &StripeInvoice) -> UseCaseResult<WebhookEffect> {
        let Some(subscription) = self.find_invoice_subscription(invoice).await? else {
            return Ok(WebhookEffect::UnknownSubscription);
        };

        let amount_minor = invoice.amount_due.unwrap_or(0);
        let outcome = self
            .record_invoice_payment(invoice, &subscription, PaymentStatus::Failed, amount_minor)
            .await?;
        warn!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            amount_minor,
            "stripe_webhook: invoice payment failed"
        );

        Ok(WebhookEffect::PaymentFailureRecorded {
            subscription_id: subscription.id,
            duplicate: outcome == RecordPaymentOutcome::Duplicate,
        })
    }

    async fn find_invoice_subscription(
        &self,
        invoice: &StripeInvoice,
    ) -> UseCaseResult<Option<SubscriptionEntity>> {
        let invoice_id = invoice.id.as_deref().unwrap_or_default();
        let Some(provider_subscription_id) = invoice.subscription_id() else {
            info!(invoice_id, "stripe_webhook: invoice is not tied to a subscription");
            return Ok(None);
        };

        let subscription = self
            .subscription_repo
            .find_by_provider_subscription_id(provider_subscription_id)
            .await
            .map_err(|err| {
                error!(invoice_id, provider_subscription_id, db_error = ?err, "stripe_webhook: failed to look up subscription");
                BillingError::Internal(err)
            })?;

        if subscription.is_none() {
            info!(invoice_id, provider_subscription_id, "stripe_webhook: invoice for unknown subscription ignored");
        }

        Ok(subscription)
    }

    async fn record_invoice_payment(
        &self,
        invoice: &StripeInvoice,
        subscription: &SubscriptionEntity,
        status: PaymentStatus,
        amount_minor: i64,
    ) -> UseCaseResult<RecordPaymentOutcome> {
        let payment = InsertPaymentEntity {
            user_id: subscription.user_id,
            subscription_id: Some(subscription.id),
            amount_minor,
            currency: invoice
                .currency
                .clone()
                .unwrap_or_else(|| subscription.currency.clone()),
            status: status.to_string(),
            payment_method: "card".to_string(),
            provider_payment_intent_id: invoice.payment_intent_id().map(str::to_string),
            provider_customer_id: invoice
                .customer_id()
                .map(str::to_string)
                .or_else(|| subscription.provider_customer_id.clone()),
            provider_invoice_id: invoice.id.clone(),
            receipt_url: invoice.hosted_invoice_url.clone(),
        };

        let outcome = self.payment_repo.record_payment(payment).await.map_err(|err| {
            error!(
                subscription_id = %subscription.id,
                invoice_id = invoice.id.as_deref().unwrap_or_default(),
                status = %status,
                db_error = ?err,
                "stripe_webhook: failed to record invoice payment"
            );
            BillingError::Internal(err)
        })?;

        if outcome == RecordPaymentOutcome::Duplicate {
            info!(
                subscription_id = %subscription.id,
                invoice_id = invoice.id.as_deref().unwrap_or_default(),
                status = %status,
                "stripe_webhook: invoice payment already recorded"
            );
        }

        Ok(outcome)
    }
}

/// Best-effort `type` of a payload that did not decode as an event.
fn declared_event_type(payload: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| value.get("type")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_string())
}
