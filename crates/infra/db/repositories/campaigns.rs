use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::campaigns},
};
use domain::{
    entities::campaigns::{CampaignEntity, CampaignRow, InsertCampaignEntity},
    repositories::campaigns::CampaignRepository,
    value_objects::campaigns::CampaignPreferences,
};

pub struct CampaignPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CampaignPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CampaignRepository for CampaignPostgres {
    async fn find_for_user(
        &self,
        campaign_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CampaignEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = campaigns::table
            .filter(campaigns::id.eq(campaign_id))
            .filter(campaigns::user_id.eq(user_id))
            .select(CampaignRow::as_select())
            .first::<CampaignRow>(&mut conn)
            .optional()?;

        Ok(row.map(CampaignEntity::from))
    }

    async fn create(&self, campaign: InsertCampaignEntity) -> Result<CampaignEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = insert_into(campaigns::table)
            .values(&campaign)
            .returning(CampaignRow::as_returning())
            .get_result::<CampaignRow>(&mut conn)?;

        Ok(row.into())
    }

    async fn update_preferences(
        &self,
        campaign_id: Uuid,
        preferences: CampaignPreferences,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(campaigns::table.filter(campaigns::id.eq(campaign_id)))
            .set((
                campaigns::demographics.eq(json!(preferences.demographics)),
                campaigns::interests.eq(json!(preferences.interests)),
                campaigns::behaviors.eq(json!(preferences.behaviors)),
                campaigns::social_account.eq(json!(preferences.social_account)),
                campaigns::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        if updated == 0 {
            bail!("campaign {campaign_id} not found while updating preferences");
        }

        Ok(())
    }

    async fn count_all(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        Ok(campaigns::table.count().get_result::<i64>(&mut conn)?)
    }
}
