use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, RecordPaymentOutcome},
    value_objects::subscriptions::PaymentStatusSummary,
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn record_payment(&self, payment: InsertPaymentEntity) -> Result<RecordPaymentOutcome>;

    /// Newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PaymentEntity>>;

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64>;

    async fn count_all(&self) -> Result<i64>;

    /// Count and total per status for payments created in `[from, to)`.
    async fn summarize_by_status(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentStatusSummary>>;
}
