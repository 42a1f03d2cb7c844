pub mod campaigns;
pub mod checkout_locks;
pub mod payments;
pub mod plans;
pub mod subscriptions;
pub mod users;
