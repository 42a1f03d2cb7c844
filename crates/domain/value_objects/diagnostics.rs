use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsStatus {
    Success,
    /// The ledger answered but Stripe did not.
    Degraded,
}

/// Whether a secret is set, without revealing it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Presence {
    Configured,
    Missing,
}

impl Presence {
    pub fn of(value: &str) -> Self {
        if value.trim().is_empty() {
            Presence::Missing
        } else {
            Presence::Configured
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StripeConnectivity {
    pub connected: bool,
    pub customer_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LedgerCounts {
    pub plans: i64,
    pub subscriptions: i64,
    pub payments: i64,
    pub campaigns: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConfigPresence {
    pub webhook_secret: Presence,
    pub stripe_key: Presence,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub status: DiagnosticsStatus,
    pub timestamp: DateTime<Utc>,
    pub stripe: StripeConnectivity,
    pub database: LedgerCounts,
    pub config: ConfigPresence,
}
