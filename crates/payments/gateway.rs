use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::payments::{
    errors::StripeError,
    stripe_client::StripeClient,
    stripe_types::{
        CheckoutSessionRequest, CreatedCheckoutSession, StripeCheckoutSession, StripeCustomer,
        StripeEvent, StripeSubscription,
    },
};

/// Billing-provider operations used by the checkout and webhook flows.
#[automock]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        user_id: Uuid,
    ) -> Result<String, StripeError>;

    async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer, StripeError>;

    async fn list_customers(&self, limit: u8) -> Result<Vec<StripeCustomer>, StripeError>;

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, StripeError>;

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<StripeCheckoutSession, StripeError>;

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, StripeError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), StripeError>;

    async fn update_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<StripeSubscription, StripeError>;

    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeError>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        user_id: Uuid,
    ) -> Result<String, StripeError> {
        StripeClient::create_customer(self, email, name, user_id).await
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer, StripeError> {
        StripeClient::retrieve_customer(self, customer_id).await
    }

    async fn list_customers(&self, limit: u8) -> Result<Vec<StripeCustomer>, StripeError> {
        StripeClient::list_customers(self, limit).await
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, StripeError> {
        StripeClient::create_checkout_session(self, request).await
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<StripeCheckoutSession, StripeError> {
        StripeClient::retrieve_checkout_session(self, session_id).await
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, StripeError> {
        StripeClient::retrieve_subscription(self, subscription_id).await
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), StripeError> {
        StripeClient::cancel_subscription(self, subscription_id).await
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<StripeSubscription, StripeError> {
        StripeClient::update_subscription(self, subscription_id, cancel_at_period_end).await
    }

    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeError> {
        StripeClient::construct_event(self, payload, signature_header)
    }
}
