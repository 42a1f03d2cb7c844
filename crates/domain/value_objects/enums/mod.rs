pub mod billing_cycles;
pub mod campaign_statuses;
pub mod payment_statuses;
pub mod subscription_statuses;
