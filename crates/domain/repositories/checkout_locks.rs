use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

/// Short-lived per-user marker that serializes checkout initiation.
#[automock]
#[async_trait]
pub trait CheckoutLockRepository {
    /// Returns `false` when another unexpired lock is held for the user.
    async fn try_acquire(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool>;

    async fn release(&self, user_id: Uuid) -> Result<()>;
}
