use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
    pub provider_payment_intent_id: Option<String>,
    pub provider_customer_id: Option<String>,
    pub provider_invoice_id: Option<String>,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
    pub provider_payment_intent_id: Option<String>,
    pub provider_customer_id: Option<String>,
    pub provider_invoice_id: Option<String>,
    pub receipt_url: Option<String>,
}

/// Result of inserting a payment keyed by provider invoice id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPaymentOutcome {
    Recorded(Uuid),
    /// A payment with the same invoice id and status already exists.
    Duplicate,
}
