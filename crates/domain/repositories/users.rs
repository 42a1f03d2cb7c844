use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::UserEntity;

#[automock]
#[async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;

    /// Overwrites whatever customer id was stored before.
    async fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: &str) -> Result<()>;
}
