use std::sync::Arc;

use boostline_core::{
    domain::{
        repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
        value_objects::subscriptions::CheckoutResultDto,
    },
    notifications::EmailSender,
    payments::{gateway::StripeGateway, stripe_types::StripeCheckoutSession},
};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    activation::CheckoutActivator,
    errors::{BillingError, UseCaseResult},
};

/// Synchronous read of a checkout after Stripe redirects the browser back.
///
/// The webhook may not have arrived yet, so a paid session is materialized here
/// through the same activator; whichever path runs second sees the idempotency gate.
pub struct CheckoutResultUseCase<S, U, G, M>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    stripe: Arc<G>,
    activator: Arc<CheckoutActivator<S, U, G, M>>,
}

impl<S, U, G, M> CheckoutResultUseCase<S, U, G, M>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
    M: EmailSender + 'static,
{
    pub fn new(stripe: Arc<G>, activator: Arc<CheckoutActivator<S, U, G, M>>) -> Self {
        Self { stripe, activator }
    }

    pub async fn checkout_result(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> UseCaseResult<CheckoutResultDto> {
        if session_id.trim().is_empty() {
            return Err(BillingError::validation("Session id is required"));
        }
        if !StripeCheckoutSession::is_valid_id(session_id) {
            warn!(%user_id, "checkout_result: malformed session id");
            return Err(BillingError::validation("Invalid session id"));
        }

        let session = self
            .stripe
            .retrieve_checkout_session(session_id)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    BillingError::CheckoutSessionNotFound
                } else {
                    warn!(%user_id, session_id, error = ?err, "checkout_result: failed to retrieve session");
                    BillingError::Provider(err)
                }
            })?;

        let owner = session.metadata.get("user_id").map(String::as_str);
        if owner != Some(user_id.to_string().as_str()) {
            warn!(%user_id, session_id, "checkout_result: session belongs to another user");
            return Err(BillingError::CheckoutSessionNotFound);
        }

        if !session.is_paid() {
            info!(
                %user_id,
                session_id,
                payment_status = session.payment_status.as_deref().unwrap_or("unknown"),
                "checkout_result: payment not completed"
            );
            return Err(BillingError::PaymentNotCompleted);
        }

        let materialized = self.activator.materialize(&session).await?;
        info!(
            %user_id,
            session_id,
            subscription_id = %materialized.subscription_id,
            newly_activated = materialized.newly_activated,
            "checkout_result: checkout confirmed"
        );

        Ok(materialized.into_result_dto())
    }
}
