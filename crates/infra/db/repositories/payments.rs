use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    OptionalExtension, RunQueryDsl,
    dsl::{count_star, sql},
    insert_into,
    prelude::*,
    sql_types::BigInt,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, RecordPaymentOutcome},
    repositories::payments::PaymentRepository,
    value_objects::{enums::payment_statuses::PaymentStatus, subscriptions::PaymentStatusSummary},
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn record_payment(&self, payment: InsertPaymentEntity) -> Result<RecordPaymentOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // (provider_invoice_id, status) is unique; checkout payments carry no invoice id.
        let payment_id = insert_into(payments::table)
            .values(&payment)
            .on_conflict((payments::provider_invoice_id, payments::status))
            .do_nothing()
            .returning(payments::id)
            .get_result::<Uuid>(&mut conn)
            .optional()?;

        Ok(match payment_id {
            Some(id) => RecordPaymentOutcome::Recorded(id),
            None => RecordPaymentOutcome::Duplicate,
        })
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = payments::table
            .filter(payments::user_id.eq(user_id))
            .order((payments::created_at.desc(), payments::id.desc()))
            .limit(limit)
            .offset(offset)
            .select(PaymentEntity::as_select())
            .load::<PaymentEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = payments::table
            .filter(payments::user_id.eq(user_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count)
    }

    async fn count_all(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        Ok(payments::table.count().get_result::<i64>(&mut conn)?)
    }

    async fn summarize_by_status(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentStatusSummary>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = payments::table
            .filter(payments::created_at.ge(from))
            .filter(payments::created_at.lt(to))
            .group_by((payments::status, payments::currency))
            .select((
                payments::status,
                payments::currency,
                count_star(),
                sql::<BigInt>("COALESCE(SUM(amount_minor), 0)::bigint"),
            ))
            .order((payments::status.asc(), payments::currency.asc()))
            .load::<(String, String, i64, i64)>(&mut conn)?;

        let summaries = rows
            .into_iter()
            .filter_map(|(status, currency, count, total_amount_minor)| {
                match PaymentStatus::from_str(&status) {
                    Some(status) => Some(PaymentStatusSummary {
                        status,
                        currency,
                        count,
                        total_amount_minor,
                    }),
                    None => {
                        warn!(%status, "payments: skipping unknown status in summary");
                        None
                    }
                }
            })
            .collect();

        Ok(summaries)
    }
}
