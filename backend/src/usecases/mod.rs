pub mod activation;
pub mod checkout;
pub mod checkout_result;
pub mod customer_identity;
pub mod dashboard;
pub mod diagnostics;
pub mod errors;
pub mod plan_resolver;
pub mod subscriptions;
pub mod webhook_processor;
