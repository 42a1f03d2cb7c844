use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{campaigns, payments, plans, subscriptions},
    },
};
use domain::{
    entities::{
        payments::InsertPaymentEntity,
        plans::{PlanEntity, PlanRow},
        subscriptions::{ActivationOutcome, CheckoutActivation, SubscriptionEntity},
    },
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::{
        campaign_statuses::CampaignStatus, subscription_statuses::SubscriptionStatus,
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[derive(Debug)]
enum ActivationTxError {
    CampaignMissing,
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for ActivationTxError {
    fn from(value: diesel::result::Error) -> Self {
        ActivationTxError::Db(value)
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::id.eq(subscription_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .order(subscriptions::created_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_active_with_plan_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(SubscriptionEntity, Option<PlanEntity>)>> {
        let Some(subscription) = self.find_active_by_user(user_id).await? else {
            return Ok(None);
        };

        let mut conn = Arc::clone(&self.db_pool).get()?;
        let plan = plans::table
            .filter(plans::id.eq(subscription.plan_id))
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?
            .map(PlanEntity::from);

        Ok(Some((subscription, plan)))
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::provider_subscription_id.eq(provider_subscription_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn mark_cancelled(&self, subscription_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let updated = update(subscriptions::table)
            .filter(subscriptions::id.eq(subscription_id))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .set((
                subscriptions::status.eq(SubscriptionStatus::Cancelled.to_string()),
                subscriptions::canceled_at.eq(Some(now)),
                subscriptions::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn update_next_billing_at(
        &self,
        subscription_id: Uuid,
        next_billing_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(subscriptions::table)
            .filter(subscriptions::id.eq(subscription_id))
            .set((
                subscriptions::next_billing_at.eq(Some(next_billing_at)),
                subscriptions::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn activate_from_checkout(
        &self,
        activation: CheckoutActivation,
    ) -> Result<ActivationOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();
        let user_id = activation.subscription.user_id;
        let campaign_id = activation.campaign_id;
        let provider_subscription_id = activation.subscription.provider_subscription_id.clone();

        let result = conn.transaction::<ActivationOutcome, ActivationTxError, _>(|conn| {
            // The unique index on provider_subscription_id is the idempotency gate for
            // concurrent deliveries: the loser of the race inserts nothing.
            let inserted = insert_into(subscriptions::table)
                .values(&activation.subscription)
                .on_conflict(subscriptions::provider_subscription_id)
                .do_nothing()
                .returning(subscriptions::id)
                .get_result::<Uuid>(conn)
                .optional()?;

            let Some(subscription_id) = inserted else {
                let existing = subscriptions::table
                    .filter(subscriptions::provider_subscription_id.eq(&provider_subscription_id))
                    .select(subscriptions::id)
                    .first::<Uuid>(conn)?;
                return Ok(ActivationOutcome::AlreadyActivated {
                    subscription_id: existing,
                });
            };

            let superseded = update(subscriptions::table)
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .filter(subscriptions::id.ne(subscription_id))
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Cancelled.to_string()),
                    subscriptions::canceled_at.eq(Some(now)),
                    subscriptions::updated_at.eq(now),
                ))
                .returning(SubscriptionEntity::as_returning())
                .get_results::<SubscriptionEntity>(conn)?;

            let payment = InsertPaymentEntity {
                subscription_id: Some(subscription_id),
                ..activation.payment.clone()
            };
            let payment_id = insert_into(payments::table)
                .values(&payment)
                .returning(payments::id)
                .get_result::<Uuid>(conn)?;

            let campaign_rows = update(campaigns::table)
                .filter(campaigns::id.eq(campaign_id))
                .filter(campaigns::user_id.eq(user_id))
                .set((
                    campaigns::status.eq(CampaignStatus::Active.to_string()),
                    campaigns::subscription_id.eq(Some(subscription_id)),
                    campaigns::started_at.eq(Some(activation.activated_at)),
                    campaigns::updated_at.eq(now),
                ))
                .execute(conn)?;

            if campaign_rows == 0 {
                return Err(ActivationTxError::CampaignMissing);
            }

            Ok(ActivationOutcome::Activated {
                subscription_id,
                payment_id,
                superseded,
            })
        });

        match result {
            Ok(outcome) => Ok(outcome),
            Err(ActivationTxError::CampaignMissing) => Err(anyhow!(
                "campaign {campaign_id} for user {user_id} not found; checkout activation rolled back"
            )),
            Err(ActivationTxError::Db(err)) => Err(anyhow!(err).context(format!(
                "checkout activation for user {user_id} campaign {campaign_id} rolled back"
            ))),
        }
    }

    async fn count_all(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        Ok(subscriptions::table.count().get_result::<i64>(&mut conn)?)
    }
}
