use std::collections::HashMap;

use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    domain::value_objects::enums::billing_cycles::BillingCycle, payments::errors::StripeError,
};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";
pub const INVOICE_PAID: &str = "invoice.paid";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Decodes `data.object` into the shape expected for this event type.
    pub fn object_as<T: DeserializeOwned>(&self) -> Result<T, StripeError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|err| StripeError::Decode(format!("{} object: {err}", self.type_)))
    }
}

/// A reference that Stripe renders either as a bare id or as the expanded object.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExpandableId {
    Id(String),
    Object { id: String },
}

impl ExpandableId {
    pub fn id(&self) -> &str {
        match self {
            ExpandableId::Id(id) => id,
            ExpandableId::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub mode: Option<String>,
    pub subscription: Option<ExpandableId>,
    pub customer: Option<ExpandableId>,
    pub payment_intent: Option<ExpandableId>,
    pub currency: Option<String>,
    pub amount_total: Option<i64>,
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeCheckoutSession {
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(ExpandableId::id)
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(ExpandableId::id)
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent.as_ref().map(ExpandableId::id)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    /// Shape of a Checkout Session id (`cs_` followed by ASCII alphanumerics or `_`).
    /// Ids are interpolated into API paths, so anything else is refused up front.
    pub fn is_valid_id(session_id: &str) -> bool {
        session_id.strip_prefix("cs_").is_some_and(|rest| {
            !rest.is_empty()
                && rest
                    .bytes()
                    .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: Option<String>,
    pub cancel_at_period_end: Option<bool>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Period end from the subscription, or from its first item on newer API versions.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: Option<String>,
    pub subscription: Option<ExpandableId>,
    pub parent: Option<InvoiceParent>,
    pub billing_reason: Option<String>,
    pub amount_paid: Option<i64>,
    pub amount_due: Option<i64>,
    pub currency: Option<String>,
    pub payment_intent: Option<ExpandableId>,
    pub customer: Option<ExpandableId>,
    pub hosted_invoice_url: Option<String>,
    #[serde(default)]
    pub lines: InvoiceLines,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceParent {
    pub subscription_details: Option<InvoiceSubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSubscriptionDetails {
    pub subscription: Option<ExpandableId>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InvoiceLines {
    pub data: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLine {
    pub period: Option<InvoiceLinePeriod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLinePeriod {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl StripeInvoice {
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription
            .as_ref()
            .or_else(|| {
                self.parent
                    .as_ref()
                    .and_then(|parent| parent.subscription_details.as_ref())
                    .and_then(|details| details.subscription.as_ref())
            })
            .map(ExpandableId::id)
    }

    /// End of the billed period on the first line item that reports one.
    pub fn period_end(&self) -> Option<i64> {
        self.lines
            .data
            .iter()
            .find_map(|line| line.period.as_ref().and_then(|period| period.end))
    }

    pub fn is_subscription_create(&self) -> bool {
        self.billing_reason.as_deref() == Some("subscription_create")
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent.as_ref().map(ExpandableId::id)
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(ExpandableId::id)
    }
}

/// Envelope of Stripe list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    pub email: Option<String>,
}

/// Everything needed to open a subscription-mode Checkout Session with inline pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub customer_id: String,
    pub plan_name: String,
    pub unit_amount_minor: i64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionRequest {
    pub fn product_name(&self) -> String {
        format!("{} Plan - {} Billing", self.plan_name, self.billing_cycle.label())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}
