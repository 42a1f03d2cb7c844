pub mod campaigns;
pub mod checkout_metadata;
pub mod diagnostics;
pub mod enums;
pub mod money;
pub mod plans;
pub mod subscriptions;
