use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::plans::{InsertPlanEntity, PlanEntity};

#[automock]
#[async_trait]
pub trait PlanRepository {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>>;

    /// Oldest plan with this exact name, when several exist.
    async fn find_by_name(&self, name: &str) -> Result<Option<PlanEntity>>;

    /// `None` when another writer already created a plan with this name.
    async fn create(&self, plan: InsertPlanEntity) -> Result<Option<PlanEntity>>;

    async fn count_all(&self) -> Result<i64>;
}
