use std::sync::Arc;

use anyhow::Result;
use boostline_core::{
    domain::{
        repositories::{
            campaigns::CampaignRepository, payments::PaymentRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::diagnostics::{
            ConfigPresence, DiagnosticsReport, DiagnosticsStatus, LedgerCounts,
            StripeConnectivity,
        },
    },
    payments::gateway::StripeGateway,
};
use chrono::Utc;
use tracing::{error, info, warn};

use super::errors::{BillingError, UseCaseResult};

const STRIPE_CONNECTIVITY_LIMIT: u8 = 1;

/// Connectivity and row-count report for operators.
pub struct DiagnosticsUseCase<L, S, P, C, G>
where
    L: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    C: CampaignRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    plan_repo: Arc<L>,
    subscription_repo: Arc<S>,
    payment_repo: Arc<P>,
    campaign_repo: Arc<C>,
    stripe: Arc<G>,
    config: ConfigPresence,
}

impl<L, S, P, C, G> DiagnosticsUseCase<L, S, P, C, G>
where
    L: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    C: CampaignRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    pub fn new(
        plan_repo: Arc<L>,
        subscription_repo: Arc<S>,
        payment_repo: Arc<P>,
        campaign_repo: Arc<C>,
        stripe: Arc<G>,
        config: ConfigPresence,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            payment_repo,
            campaign_repo,
            stripe,
            config,
        }
    }

    /// A Stripe failure degrades the report; a database failure fails it.
    pub async fn diagnose(&self) -> UseCaseResult<DiagnosticsReport> {
        let database = self.ledger_counts().await.map_err(|err| {
            error!(db_error = ?err, "diagnostics: failed to count ledger rows");
            BillingError::Internal(err)
        })?;

        let stripe = match self.stripe.list_customers(STRIPE_CONNECTIVITY_LIMIT).await {
            Ok(customers) => StripeConnectivity {
                connected: true,
                customer_count: customers.len(),
                error: None,
            },
            Err(err) => {
                warn!(error = ?err, "diagnostics: stripe connectivity check failed");
                StripeConnectivity {
                    connected: false,
                    customer_count: 0,
                    error: Some(err.to_string()),
                }
            }
        };

        let status = if stripe.connected {
            DiagnosticsStatus::Success
        } else {
            DiagnosticsStatus::Degraded
        };
        info!(status = ?status, counts = ?database, "diagnostics: report built");

        Ok(DiagnosticsReport {
            status,
            timestamp: Utc::now(),
            stripe,
            database,
            config: self.config.clone(),
        })
    }

    async fn ledger_counts(&self) -> Result<LedgerCounts> {
        Ok(LedgerCounts {
            plans: self.plan_repo.count_all().await?,
            subscriptions: self.subscription_repo.count_all().await?,
            payments: self.payment_repo.count_all().await?,
            campaigns: self.campaign_repo.count_all().await?,
        })
    }
}
