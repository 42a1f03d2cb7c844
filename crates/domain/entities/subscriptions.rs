use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::payments::InsertPaymentEntity;
use crate::domain::value_objects::enums::{
    billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus,
};
use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub plan_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub billing_cycle: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub next_billing_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub provider_subscription_id: Option<String>,
    pub provider_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }

    pub fn billing_cycle(&self) -> BillingCycle {
        BillingCycle::from_str(&self.billing_cycle).unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.status() == SubscriptionStatus::Active
    }
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub plan_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub billing_cycle: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub next_billing_at: Option<DateTime<Utc>>,
    pub provider_subscription_id: Option<String>,
    pub provider_customer_id: Option<String>,
}

/// The three ledger writes that make a completed checkout visible: a new active
/// subscription, its first payment, and the campaign switching to active.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutActivation {
    pub subscription: InsertSubscriptionEntity,
    /// `subscription_id` is filled in by the repository once the subscription row exists.
    pub payment: InsertPaymentEntity,
    pub campaign_id: Uuid,
    pub activated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    Activated {
        subscription_id: Uuid,
        payment_id: Uuid,
        /// Other subscriptions of the same user that were still active and got retired.
        superseded: Vec<SubscriptionEntity>,
    },
    /// The provider subscription id was already materialized; nothing was written.
    AlreadyActivated { subscription_id: Uuid },
}
