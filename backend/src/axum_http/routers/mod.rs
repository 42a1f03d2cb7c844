pub mod billing;
pub mod dashboard;
pub mod subscriptions;
pub mod webhooks;

use std::sync::Arc;

use boostline_core::{
    infra::db::repositories::{subscriptions::SubscriptionPostgres, users::UserPostgres},
    notifications::http_email::HttpEmailSender,
    payments::stripe_client::StripeClient,
};

use crate::usecases::activation::CheckoutActivator;

/// Activator wired to Postgres, Stripe, and the HTTP email API.
pub type LiveCheckoutActivator =
    CheckoutActivator<SubscriptionPostgres, UserPostgres, StripeClient, HttpEmailSender>;

pub type SharedActivator = Arc<LiveCheckoutActivator>;
