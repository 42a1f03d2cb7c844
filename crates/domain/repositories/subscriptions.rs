use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    plans::PlanEntity,
    subscriptions::{ActivationOutcome, CheckoutActivation, SubscriptionEntity},
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    /// Active subscription joined with its plan, for dashboard display.
    async fn find_active_with_plan_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(SubscriptionEntity, Option<PlanEntity>)>>;

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Moves an active subscription to cancelled. Returns `false` if it was not active.
    async fn mark_cancelled(&self, subscription_id: Uuid) -> Result<bool>;

    async fn update_next_billing_at(
        &self,
        subscription_id: Uuid,
        next_billing_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Applies the subscription, payment, and campaign writes of a completed checkout as
    /// one unit. A provider subscription id that already exists is reported as
    /// `AlreadyActivated` instead of an error.
    async fn activate_from_checkout(
        &self,
        activation: CheckoutActivation,
    ) -> Result<ActivationOutcome>;

    async fn count_all(&self) -> Result<i64>;
}
