#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use backend::usecases::{
    activation::CheckoutActivator,
    checkout::{CheckoutSettings, CheckoutUseCase},
    checkout_result::CheckoutResultUseCase,
    diagnostics::DiagnosticsUseCase,
    subscriptions::SubscriptionUseCase,
    webhook_processor::StripeWebhookProcessor,
};
use boostline_core::{
    domain::{
        entities::{
            campaigns::{CampaignEntity, InsertCampaignEntity},
            payments::{InsertPaymentEntity, PaymentEntity, RecordPaymentOutcome},
            plans::{InsertPlanEntity, PlanEntity},
            subscriptions::{
                ActivationOutcome, CheckoutActivation, InsertSubscriptionEntity,
                SubscriptionEntity,
            },
            users::UserEntity,
        },
        repositories::{
            campaigns::CampaignRepository, checkout_locks::CheckoutLockRepository,
            payments::PaymentRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::{
            campaigns::{CampaignMetrics, CampaignPreferences},
            enums::{
                campaign_statuses::CampaignStatus, payment_statuses::PaymentStatus,
                subscription_statuses::SubscriptionStatus,
            },
            diagnostics::{ConfigPresence, Presence},
            subscriptions::PaymentStatusSummary,
        },
    },
    notifications::EmailSender,
    payments::{
        errors::StripeError,
        gateway::StripeGateway,
        stripe_client::verify_signature,
        stripe_types::{
            CheckoutSessionRequest, CreatedCheckoutSession, StripeCheckoutSession,
            StripeCustomer, StripeEvent, StripeSubscription, StripeSubscriptionItems,
        },
    },
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Postgres stand-in holding every ledger table behind one lock, so checkout
/// activation applies as a unit the way the diesel transaction does.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

#[derive(Default)]
pub struct LedgerState {
    pub users: HashMap<Uuid, UserEntity>,
    pub plans: Vec<PlanEntity>,
    pub campaigns: HashMap<Uuid, CampaignEntity>,
    pub subscriptions: Vec<SubscriptionEntity>,
    pub payments: Vec<PaymentEntity>,
    pub locks: HashMap<Uuid, DateTime<Utc>>,
}

impl InMemoryLedger {
    pub fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn add_user(&self, first_name: &str, email: &str) -> Uuid {
        let now = Utc::now();
        let user = UserEntity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: String::new(),
            stripe_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        self.state().users.insert(id, user);
        id
    }

    pub fn subscriptions_for(&self, user_id: Uuid) -> Vec<SubscriptionEntity> {
        self.state()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn payments_for(&self, user_id: Uuid) -> Vec<PaymentEntity> {
        self.state()
            .payments
            .iter()
            .filter(|payment| payment.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn campaign(&self, campaign_id: Uuid) -> Option<CampaignEntity> {
        self.state().campaigns.get(&campaign_id).cloned()
    }

    /// Seeds an already active subscription, as if an earlier checkout had completed.
    pub fn seed_active_subscription(
        &self,
        user_id: Uuid,
        provider_subscription_id: &str,
        next_billing_at: DateTime<Utc>,
    ) -> SubscriptionEntity {
        let now = Utc::now();
        let subscription = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_id: Uuid::new_v4(),
            campaign_id: None,
            plan_name: "Starter".to_string(),
            amount_minor: 1900,
            currency: "usd".to_string(),
            billing_cycle: "monthly".to_string(),
            status: SubscriptionStatus::Active.to_string(),
            started_at: now,
            next_billing_at: Some(next_billing_at),
            canceled_at: None,
            provider_subscription_id: Some(provider_subscription_id.to_string()),
            provider_customer_id: Some("cus_seed".to_string()),
            created_at: now,
            updated_at: now,
        };
        self.state().subscriptions.push(subscription.clone());
        subscription
    }
}

fn subscription_from_insert(insert: InsertSubscriptionEntity) -> SubscriptionEntity {
    let now = Utc::now();
    SubscriptionEntity {
        id: Uuid::new_v4(),
        user_id: insert.user_id,
        plan_id: insert.plan_id,
        campaign_id: insert.campaign_id,
        plan_name: insert.plan_name,
        amount_minor: insert.amount_minor,
        currency: insert.currency,
        billing_cycle: insert.billing_cycle,
        status: insert.status,
        started_at: insert.started_at,
        next_billing_at: insert.next_billing_at,
        canceled_at: None,
        provider_subscription_id: insert.provider_subscription_id,
        provider_customer_id: insert.provider_customer_id,
        created_at: now,
        updated_at: now,
    }
}

fn payment_from_insert(insert: InsertPaymentEntity) -> PaymentEntity {
    let now = Utc::now();
    PaymentEntity {
        id: Uuid::new_v4(),
        user_id: insert.user_id,
        subscription_id: insert.subscription_id,
        amount_minor: insert.amount_minor,
        currency: insert.currency,
        status: insert.status,
        payment_method: insert.payment_method,
        provider_payment_intent_id: insert.provider_payment_intent_id,
        provider_customer_id: insert.provider_customer_id,
        provider_invoice_id: insert.provider_invoice_id,
        receipt_url: insert.receipt_url,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl UserRepository for InMemoryLedger {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>> {
        Ok(self.state().users.get(&user_id).cloned())
    }

    async fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: &str) -> Result<()> {
        let mut state = self.state();
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("user {user_id} not found"))?;
        user.stripe_customer_id = Some(customer_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl PlanRepository for InMemoryLedger {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        Ok(self.state().plans.iter().find(|plan| plan.id == plan_id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PlanEntity>> {
        Ok(self.state().plans.iter().find(|plan| plan.name == name).cloned())
    }

    async fn create(&self, plan: InsertPlanEntity) -> Result<Option<PlanEntity>> {
        let mut state = self.state();
        if state.plans.iter().any(|existing| existing.name == plan.name) {
            return Ok(None);
        }
        let entity = PlanEntity {
            id: Uuid::new_v4(),
            name: plan.name,
            monthly_price: plan.monthly_price,
            annual_price: plan.annual_price,
            features: serde_json::from_value(plan.features)?,
            created_at: Utc::now(),
        };
        state.plans.push(entity.clone());
        Ok(Some(entity))
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(i64::try_from(self.state().plans.len())?)
    }
}

#[async_trait]
impl CampaignRepository for InMemoryLedger {
    async fn find_for_user(
        &self,
        campaign_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CampaignEntity>> {
        Ok(self
            .state()
            .campaigns
            .get(&campaign_id)
            .filter(|campaign| campaign.user_id == user_id)
            .cloned())
    }

    async fn create(&self, campaign: InsertCampaignEntity) -> Result<CampaignEntity> {
        let entity = CampaignEntity {
            id: Uuid::new_v4(),
            user_id: campaign.user_id,
            subscription_id: None,
            status: CampaignStatus::from_str(&campaign.status),
            preferences: CampaignPreferences {
                demographics: serde_json::from_value(campaign.demographics)?,
                interests: serde_json::from_value(campaign.interests)?,
                behaviors: serde_json::from_value(campaign.behaviors)?,
                social_account: serde_json::from_value(campaign.social_account)?,
            },
            metrics: CampaignMetrics::default(),
            started_at: None,
            ended_at: None,
            created_at: Utc::now(),
        };
        self.state().campaigns.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update_preferences(
        &self,
        campaign_id: Uuid,
        preferences: CampaignPreferences,
    ) -> Result<()> {
        let mut state = self.state();
        let campaign = state
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| anyhow!("campaign {campaign_id} not found"))?;
        campaign.preferences = preferences;
        Ok(())
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(i64::try_from(self.state().campaigns.len())?)
    }
}

#[async_trait]
impl CheckoutLockRepository for InMemoryLedger {
    async fn try_acquire(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state();
        let now = Utc::now();
        match state.locks.get(&user_id) {
            Some(held_until) if *held_until > now => Ok(false),
            _ => {
                state.locks.insert(user_id, expires_at);
                Ok(true)
            }
        }
    }

    async fn release(&self, user_id: Uuid) -> Result<()> {
        self.state().locks.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryLedger {
    async fn record_payment(&self, payment: InsertPaymentEntity) -> Result<RecordPaymentOutcome> {
        let mut state = self.state();
        let duplicate = payment.provider_invoice_id.is_some()
            && state.payments.iter().any(|existing| {
                existing.provider_invoice_id == payment.provider_invoice_id
                    && existing.status == payment.status
            });
        if duplicate {
            return Ok(RecordPaymentOutcome::Duplicate);
        }

        let entity = payment_from_insert(payment);
        let id = entity.id;
        state.payments.push(entity);
        Ok(RecordPaymentOutcome::Recorded(id))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PaymentEntity>> {
        let mut payments = self.payments_for(user_id);
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments
            .into_iter()
            .skip(usize::try_from(offset)?)
            .take(usize::try_from(limit)?)
            .collect())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        Ok(i64::try_from(self.payments_for(user_id).len())?)
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(i64::try_from(self.state().payments.len())?)
    }

    async fn summarize_by_status(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentStatusSummary>> {
        let state = self.state();
        let mut totals: HashMap<(String, String), (i64, i64)> = HashMap::new();
        for payment in state
            .payments
            .iter()
            .filter(|payment| payment.created_at >= from && payment.created_at < to)
        {
            let entry = totals
                .entry((payment.status.clone(), payment.currency.clone()))
                .or_default();
            entry.0 += 1;
            entry.1 += payment.amount_minor;
        }

        Ok(totals
            .into_iter()
            .filter_map(|((status, currency), (count, total_amount_minor))| {
                Some(PaymentStatusSummary {
                    status: PaymentStatus::from_str(&status)?,
                    currency,
                    count,
                    total_amount_minor,
                })
            })
            .collect())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryLedger {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        Ok(self
            .state()
            .subscriptions
            .iter()
            .find(|subscription| subscription.id == subscription_id)
            .cloned())
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        Ok(self
            .state()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.user_id == user_id && subscription.is_active())
            .max_by_key(|subscription| subscription.started_at)
            .cloned())
    }

    async fn find_active_with_plan_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(SubscriptionEntity, Option<PlanEntity>)>> {
        let Some(subscription) = SubscriptionRepository::find_active_by_user(self, user_id).await?
        else {
            return Ok(None);
        };
        let plan = PlanRepository::find_by_id(self, subscription.plan_id).await?;
        Ok(Some((subscription, plan)))
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<SubscriptionEntity>> {
        Ok(self
            .state()
            .subscriptions
            .iter()
            .find(|subscription| {
                subscription.provider_subscription_id.as_deref() == Some(provider_subscription_id)
            })
            .cloned())
    }

    async fn mark_cancelled(&self, subscription_id: Uuid) -> Result<bool> {
        let mut state = self.state();
        let Some(subscription) = state
            .subscriptions
            .iter_mut()
            .find(|subscription| subscription.id == subscription_id && subscription.is_active())
        else {
            return Ok(false);
        };
        subscription.status = SubscriptionStatus::Cancelled.to_string();
        subscription.canceled_at = Some(Utc::now());
        Ok(true)
    }

    async fn update_next_billing_at(
        &self,
        subscription_id: Uuid,
        next_billing_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state();
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|subscription| subscription.id == subscription_id)
            .ok_or_else(|| anyhow!("subscription {subscription_id} not found"))?;
        subscription.next_billing_at = Some(next_billing_at);
        Ok(())
    }

    async fn activate_from_checkout(
        &self,
        activation: CheckoutActivation,
    ) -> Result<ActivationOutcome> {
        let mut state = self.state();
        let CheckoutActivation {
            subscription,
            mut payment,
            campaign_id,
            activated_at,
        } = activation;

        if let Some(existing) = state.subscriptions.iter().find(|existing| {
            existing.provider_subscription_id.is_some()
                && existing.provider_subscription_id == subscription.provider_subscription_id
        }) {
            return Ok(ActivationOutcome::AlreadyActivated {
                subscription_id: existing.id,
            });
        }

        let user_id = subscription.user_id;
        let campaign_owned = state
            .campaigns
            .get(&campaign_id)
            .is_some_and(|campaign| campaign.user_id == user_id);
        if !campaign_owned {
            return Err(anyhow!(
                "campaign {campaign_id} not found; checkout activation rolled back"
            ));
        }

        let mut superseded = Vec::new();
        for existing in state
            .subscriptions
            .iter_mut()
            .filter(|existing| existing.user_id == user_id && existing.is_active())
        {
            existing.status = SubscriptionStatus::Cancelled.to_string();
            existing.canceled_at = Some(activated_at);
            superseded.push(existing.clone());
        }

        let created = subscription_from_insert(subscription);
        let subscription_id = created.id;
        state.subscriptions.push(created);

        payment.subscription_id = Some(subscription_id);
        let payment = payment_from_insert(payment);
        let payment_id = payment.id;
        state.payments.push(payment);

        if let Some(campaign) = state.campaigns.get_mut(&campaign_id) {
            campaign.status = CampaignStatus::Active;
            campaign.subscription_id = Some(subscription_id);
            campaign.started_at = Some(activated_at);
        }

        Ok(ActivationOutcome::Activated {
            subscription_id,
            payment_id,
            superseded,
        })
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(i64::try_from(self.state().subscriptions.len())?)
    }
}

/// Stripe stand-in that keeps sessions and subscriptions in memory but verifies
/// webhook signatures with the real algorithm.
#[derive(Default)]
pub struct FakeStripe {
    state: Mutex<FakeStripeState>,
}

#[derive(Default)]
pub struct FakeStripeState {
    next_id: u32,
    pub customers: Vec<String>,
    pub sessions: HashMap<String, StoredSession>,
    pub period_ends: HashMap<String, i64>,
    pub cancelled: Vec<String>,
    pub scheduled_cancellations: Vec<String>,
}

#[derive(Clone)]
pub struct StoredSession {
    pub request: CheckoutSessionRequest,
    pub subscription_id: Option<String>,
    pub paid: bool,
}

impl FakeStripe {
    pub fn state(&self) -> MutexGuard<'_, FakeStripeState> {
        self.state.lock().unwrap()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.next_id += 1;
        format!("{prefix}_{}", state.next_id)
    }

    /// Simulates the customer paying: the session gets a subscription whose current
    /// period ends at `period_end`. Returns the session object as Stripe sends it.
    pub fn complete_checkout(
        &self,
        session_id: &str,
        provider_subscription_id: &str,
        period_end: DateTime<Utc>,
    ) -> Value {
        let mut state = self.state();
        state
            .period_ends
            .insert(provider_subscription_id.to_string(), period_end.timestamp());
        let session = state
            .sessions
            .get_mut(session_id)
            .expect("checkout session was created");
        session.subscription_id = Some(provider_subscription_id.to_string());
        session.paid = true;
        session_json(session_id, session)
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state().cancelled.clone()
    }
}

fn session_json(session_id: &str, session: &StoredSession) -> Value {
    json!({
        "id": session_id,
        "object": "checkout.session",
        "mode": "subscription",
        "subscription": session.subscription_id,
        "customer": session.request.customer_id,
        "payment_intent": null,
        "currency": session.request.currency,
        "amount_total": session.request.unit_amount_minor,
        "payment_status": if session.paid { "paid" } else { "unpaid" },
        "metadata": session.request.metadata,
    })
}

#[async_trait]
impl StripeGateway for FakeStripe {
    async fn create_customer(
        &self,
        _email: &str,
        _name: &str,
        _user_id: Uuid,
    ) -> Result<String, StripeError> {
        let id = self.next_id("cus");
        self.state().customers.push(id.clone());
        Ok(id)
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer, StripeError> {
        if self.state().customers.iter().any(|id| id == customer_id) {
            Ok(StripeCustomer {
                id: customer_id.to_string(),
                deleted: false,
                email: None,
            })
        } else {
            Err(StripeError::not_found("retrieve customer"))
        }
    }

    async fn list_customers(&self, limit: u8) -> Result<Vec<StripeCustomer>, StripeError> {
        Ok(self
            .state()
            .customers
            .iter()
            .take(usize::from(limit))
            .map(|id| StripeCustomer {
                id: id.clone(),
                deleted: false,
                email: None,
            })
            .collect())
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, StripeError> {
        let id = self.next_id("cs_test");
        self.state().sessions.insert(
            id.clone(),
            StoredSession {
                request,
                subscription_id: None,
                paid: false,
            },
        );
        Ok(CreatedCheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{id}")),
            id,
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<StripeCheckoutSession, StripeError> {
        let state = self.state();
        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| StripeError::not_found("retrieve checkout session"))?;
        serde_json::from_value(session_json(session_id, session))
            .map_err(|err| StripeError::Decode(err.to_string()))
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, StripeError> {
        let period_end = self
            .state()
            .period_ends
            .get(subscription_id)
            .copied()
            .ok_or_else(|| StripeError::not_found("retrieve subscription"))?;
        Ok(StripeSubscription {
            id: subscription_id.to_string(),
            status: Some("active".to_string()),
            cancel_at_period_end: Some(false),
            current_period_end: Some(period_end),
            items: StripeSubscriptionItems::default(),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), StripeError> {
        self.state().cancelled.push(subscription_id.to_string());
        Ok(())
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<StripeSubscription, StripeError> {
        if cancel_at_period_end {
            self.state()
                .scheduled_cancellations
                .push(subscription_id.to_string());
        }
        let mut subscription = self.retrieve_subscription(subscription_id).await?;
        subscription.cancel_at_period_end = Some(cancel_at_period_end);
        Ok(subscription)
    }

    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeError> {
        verify_signature(
            payload,
            signature_header,
            WEBHOOK_SECRET,
            WEBHOOK_TOLERANCE_SECS,
            Utc::now().timestamp(),
        )?;
        serde_json::from_slice(payload).map_err(|err| StripeError::Decode(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

pub fn event_payload(event_id: &str, event_type: &str, object: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": event_id,
        "object": "event",
        "type": event_type,
        "created": Utc::now().timestamp(),
        "livemode": false,
        "data": { "object": object },
    }))
    .unwrap()
}

/// `Stripe-Signature` header value for `payload`, signed the way Stripe signs it.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn signed(payload: &[u8]) -> String {
    sign(payload, WEBHOOK_SECRET, Utc::now().timestamp())
}

pub type TestActivator =
    CheckoutActivator<InMemoryLedger, InMemoryLedger, FakeStripe, RecordingMailer>;

/// Every billing use case wired to the same in-memory ledger and fake Stripe.
pub struct BillingHarness {
    pub ledger: Arc<InMemoryLedger>,
    pub stripe: Arc<FakeStripe>,
    pub mailer: Arc<RecordingMailer>,
    pub checkout: CheckoutUseCase<
        InMemoryLedger,
        InMemoryLedger,
        InMemoryLedger,
        InMemoryLedger,
        InMemoryLedger,
        FakeStripe,
    >,
    pub checkout_result:
        CheckoutResultUseCase<InMemoryLedger, InMemoryLedger, FakeStripe, RecordingMailer>,
    pub webhooks: StripeWebhookProcessor<
        InMemoryLedger,
        InMemoryLedger,
        InMemoryLedger,
        FakeStripe,
        RecordingMailer,
    >,
    pub subscriptions: SubscriptionUseCase<InMemoryLedger, InMemoryLedger, FakeStripe>,
    pub diagnostics: DiagnosticsUseCase<
        InMemoryLedger,
        InMemoryLedger,
        InMemoryLedger,
        InMemoryLedger,
        FakeStripe,
    >,
}

impl BillingHarness {
    pub fn new() -> Self {
        let ledger = Arc::new(InMemoryLedger::default());
        let stripe = Arc::new(FakeStripe::default());
        let mailer = Arc::new(RecordingMailer::default());

        let activator: Arc<TestActivator> = Arc::new(CheckoutActivator::new(
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&stripe),
            Arc::clone(&mailer),
            "usd".to_string(),
        ));

        let checkout = CheckoutUseCase::new(
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&stripe),
            CheckoutSettings {
                currency: "usd".to_string(),
                lock_ttl: Duration::seconds(120),
            },
        );
        let checkout_result = CheckoutResultUseCase::new(Arc::clone(&stripe), Arc::clone(&activator));
        let webhooks = StripeWebhookProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&stripe),
            activator,
        );
        let subscriptions = SubscriptionUseCase::new(
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&stripe),
        );
        let diagnostics = DiagnosticsUseCase::new(
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&ledger),
            Arc::clone(&stripe),
            ConfigPresence {
                webhook_secret: Presence::of(WEBHOOK_SECRET),
                stripe_key: Presence::of("sk_test_fake"),
                frontend_url: "http://localhost:5173".to_string(),
            },
        );

        Self {
            ledger,
            stripe,
            mailer,
            checkout,
            checkout_result,
            webhooks,
            subscriptions,
            diagnostics,
        }
    }
}
