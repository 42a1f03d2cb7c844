pub mod http_email;
pub mod templates;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// Outbound transactional email.
#[automock]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}
