use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::campaigns::{CampaignEntity, InsertCampaignEntity},
    value_objects::campaigns::CampaignPreferences,
};

#[automock]
#[async_trait]
pub trait CampaignRepository {
    /// Only returns the campaign when it belongs to `user_id`.
    async fn find_for_user(&self, campaign_id: Uuid, user_id: Uuid)
    -> Result<Option<CampaignEntity>>;

    async fn create(&self, campaign: InsertCampaignEntity) -> Result<CampaignEntity>;

    async fn update_preferences(
        &self,
        campaign_id: Uuid,
        preferences: CampaignPreferences,
    ) -> Result<()>;

    async fn count_all(&self) -> Result<i64>;
}
