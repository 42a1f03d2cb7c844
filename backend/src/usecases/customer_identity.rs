use std::sync::Arc;

use boostline_core::{
    domain::{entities::users::UserEntity, repositories::users::UserRepository},
    payments::gateway::StripeGateway,
};
use tracing::{error, info, warn};

use super::errors::{BillingError, UseCaseResult};

/// Keeps each user bound to a Stripe customer that still exists on the provider side.
pub struct CustomerIdentityBinder<U, G>
where
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    user_repo: Arc<U>,
    stripe: Arc<G>,
}

impl<U, G> CustomerIdentityBinder<U, G>
where
    U: UserRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    pub fn new(user_repo: Arc<U>, stripe: Arc<G>) -> Self {
        Self { user_repo, stripe }
    }

    pub async fn ensure_customer(&self, user: &UserEntity) -> UseCaseResult<String> {
        let user_id = user.id;

        if let Some(stored) = user.stripe_customer_id.as_deref().filter(|id| !id.is_empty()) {
            match self.stripe.retrieve_customer(stored).await {
                Ok(customer) => return Ok(customer.id),
                Err(err) if err.is_not_found() => {
                    warn!(
                        %user_id,
                        customer_id = stored,
                        "customer_identity: stored customer no longer exists; creating replacement"
                    );
                }
                Err(err) => {
                    error!(
                        %user_id,
                        customer_id = stored,
                        error = ?err,
                        "customer_identity: failed to verify stored customer"
                    );
                    return Err(BillingError::Provider(err));
                }
            }
        }

        let customer_id = self
            .stripe
            .create_customer(&user.email, &user.full_name(), user_id)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "customer_identity: failed to create customer");
                BillingError::Provider(err)
            })?;

        self.user_repo
            .set_stripe_customer_id(user_id, &customer_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    db_error = ?err,
                    "customer_identity: failed to persist customer id"
                );
                BillingError::Internal(err)
            })?;

        info!(%user_id, %customer_id, "customer_identity: bound new customer");
        Ok(customer_id)
    }
}
