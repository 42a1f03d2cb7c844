use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{
    payments::PaymentEntity, plans::PlanEntity, subscriptions::SubscriptionEntity,
};
use crate::domain::value_objects::{
    campaigns::CampaignPreferencesInput,
    enums::{
        billing_cycles::BillingCycle, payment_statuses::PaymentStatus,
        subscription_statuses::SubscriptionStatus,
    },
    money::from_minor_units,
};

/// Checkout forms post the price either as a JSON number or as a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SubmittedPrice {
    Number(f64),
    Text(String),
}

impl SubmittedPrice {
    pub fn parse(&self) -> Option<f64> {
        match self {
            SubmittedPrice::Number(value) => Some(*value),
            SubmittedPrice::Text(raw) => raw.trim().parse::<f64>().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    #[serde(default, alias = "planName")]
    pub plan_name: Option<String>,
    #[serde(default, alias = "planPrice")]
    pub plan_price: Option<SubmittedPrice>,
    #[serde(default, alias = "billing")]
    pub billing_cycle: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub preferences: Option<CampaignPreferencesInput>,
    #[serde(default, alias = "campaignId")]
    pub campaign_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutSessionDto {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutResultDto {
    pub success: bool,
    pub order_id: String,
    pub plan_name: String,
    pub amount: f64,
    pub billing_cycle: BillingCycle,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummaryDto {
    pub id: Uuid,
    pub name: String,
    pub monthly_price: f64,
    pub annual_price: f64,
    pub features: Vec<String>,
}

impl From<PlanEntity> for PlanSummaryDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            monthly_price: value.monthly_price,
            annual_price: value.annual_price,
            features: value.features,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentSubscriptionDto {
    pub id: Uuid,
    pub plan_name: String,
    pub amount: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub next_billing_at: Option<DateTime<Utc>>,
    pub campaign_id: Option<Uuid>,
    pub plan: Option<PlanSummaryDto>,
}

impl CurrentSubscriptionDto {
    pub fn new(subscription: SubscriptionEntity, plan: Option<PlanEntity>) -> Self {
        Self {
            id: subscription.id,
            amount: from_minor_units(subscription.amount_minor),
            billing_cycle: subscription.billing_cycle(),
            status: subscription.status(),
            plan_name: subscription.plan_name,
            currency: subscription.currency,
            started_at: subscription.started_at,
            next_billing_at: subscription.next_billing_at,
            campaign_id: subscription.campaign_id,
            plan: plan.map(PlanSummaryDto::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CancelSubscriptionDto {
    pub id: Uuid,
    pub status: SubscriptionStatus,
    /// Access continues until the provider's current period ends.
    pub access_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDto {
    pub id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentDto {
    fn from(value: PaymentEntity) -> Self {
        Self {
            id: value.id,
            subscription_id: value.subscription_id,
            amount: from_minor_units(value.amount_minor),
            currency: value.currency,
            status: value.status,
            payment_method: value.payment_method,
            receipt_url: value.receipt_url,
            created_at: value.created_at,
        }
    }
}

/// Totals are never mixed across currencies: one row per (status, currency).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentStatusSummary {
    pub status: PaymentStatus,
    pub currency: String,
    pub count: i64,
    pub total_amount_minor: i64,
}

pub const DEFAULT_PAYMENT_PAGE_SIZE: u32 = 50;
pub const MAX_PAYMENT_PAGE_SIZE: u32 = 100;

/// `?page=&limit=` on the payment history. Missing or zero values fall back to defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PaymentHistoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PaymentHistoryQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow {
            page: self.page.filter(|page| *page > 0).unwrap_or(1),
            limit: self
                .limit
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_PAYMENT_PAGE_SIZE)
                .min(MAX_PAYMENT_PAGE_SIZE),
        }
    }
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn pagination(&self, count: i64) -> PaginationDto {
        let limit = i64::from(self.limit);
        PaginationDto {
            current: self.page,
            total: (count.max(0) + limit - 1) / limit,
            count,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PaginationDto {
    pub current: u32,
    /// Number of pages.
    pub total: i64,
    /// Number of payments across all pages.
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentHistoryDto {
    pub payments: Vec<PaymentDto>,
    pub pagination: PaginationDto,
}

/// Short, human-facing reference for a subscription: last 8 hex digits, upper-cased.
pub fn order_id_for(subscription_id: Uuid) -> String {
    let simple = subscription_id.simple().to_string();
    simple[simple.len() - 8..].to_ascii_uppercase()
}
