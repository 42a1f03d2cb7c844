use std::sync::Arc;

use boostline_core::{
    domain::{
        entities::{campaigns::InsertCampaignEntity, users::UserEntity},
        repositories::{
            campaigns::CampaignRepository, checkout_locks::CheckoutLockRepository,
            plans::PlanRepository, subscriptions::SubscriptionRepository,
            users::UserRepository,
        },
        value_objects::{
            checkout_metadata::CheckoutMetadata,
            enums::billing_cycles::BillingCycle,
            money::to_minor_units,
            plans::validate_price,
            subscriptions::{CheckoutSessionDto, CreateCheckoutSessionRequest},
        },
    },
    payments::{gateway::StripeGateway, stripe_types::CheckoutSessionRequest},
};
use chrono::{Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    customer_identity::CustomerIdentityBinder,
    errors::{BillingError, UseCaseResult},
    plan_resolver::PlanResolver,
};

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub lock_ttl: Duration,
}

/// Checkout input after validation.
#[derive(Debug, Clone)]
struct ValidatedCheckout {
    plan_name: String,
    price: f64,
    billing_cycle: BillingCycle,
    features: Vec<String>,
}

pub struct CheckoutUseCase<P, U, C, S, L, G>
where
    P: PlanRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    C: CampaignRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    L: CheckoutLockRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    plan_resolver: PlanResolver<P>,
    customer_binder: CustomerIdentityBinder<U, G>,
    user_repo: Arc<U>,
    campaign_repo: Arc<C>,
    subscription_repo: Arc<S>,
    lock_repo: Arc<L>,
    stripe: Arc<G>,
    settings: CheckoutSettings,
}

impl<P, U, C, S, L, G> CheckoutUseCase<P, U, C, S, L, G>
where
    P: PlanRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    C: CampaignRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    L: CheckoutLockRepository + Send + Sync + 'static,
    G: StripeGateway + 'static,
{
    pub fn new(
        plan_repo: Arc<P>,
        user_repo: Arc<U>,
        campaign_repo: Arc<C>,
        subscription_repo: Arc<S>,
        lock_repo: Arc<L>,
        stripe: Arc<G>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            plan_resolver: PlanResolver::new(plan_repo),
            customer_binder: CustomerIdentityBinder::new(Arc::clone(&user_repo), Arc::clone(&stripe)),
            user_repo,
            campaign_repo,
            subscription_repo,
            lock_repo,
            stripe,
            settings,
        }
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        request: CreateCheckoutSessionRequest,
    ) -> UseCaseResult<CheckoutSessionDto> {
        let checkout = Self::validate(&request)?;
        info!(
            %user_id,
            plan_name = %checkout.plan_name,
            price = checkout.price,
            billing_cycle = %checkout.billing_cycle,
            "checkout: create checkout session requested"
        );

        let expires_at = Utc::now() + self.settings.lock_ttl;
        let acquired = self
            .lock_repo
            .try_acquire(user_id, expires_at)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to acquire checkout lock");
                BillingError::Internal(err)
            })?;
        if !acquired {
            warn!(%user_id, "checkout: another checkout is in progress");
            return Err(BillingError::CheckoutInProgress);
        }

        let result = self.open_session(user_id, checkout, request).await;

        if let Err(err) = self.lock_repo.release(user_id).await {
            warn!(%user_id, db_error = ?err, "checkout: failed to release checkout lock");
        }

        result
    }

    fn validate(request: &CreateCheckoutSessionRequest) -> UseCaseResult<ValidatedCheckout> {
        let plan_name = request
            .plan_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BillingError::validation("Plan name is required"))?;

        let price = request
            .plan_price
            .as_ref()
            .and_then(|price| price.parse())
            .and_then(|price| validate_price(price).ok())
            .ok_or_else(|| BillingError::validation("Plan price must be a valid positive number"))?;

        let billing_cycle = match request.billing_cycle.as_deref() {
            None => BillingCycle::Monthly,
            Some(raw) => BillingCycle::from_str(raw).ok_or_else(|| {
                BillingError::validation(format!("Unsupported billing cycle: {raw}"))
            })?,
        };

        if request.campaign_id.is_none() && request.preferences.is_none() {
            return Err(BillingError::validation("Campaign preferences are required"));
        }

        Ok(ValidatedCheckout {
            plan_name: plan_name.to_string(),
            price,
            billing_cycle,
            features: request.features.clone(),
        })
    }

    async fn open_session(
        &self,
        user_id: Uuid,
        checkout: ValidatedCheckout,
        request: CreateCheckoutSessionRequest,
    ) -> UseCaseResult<CheckoutSessionDto> {
        let user = self.load_user(user_id).await?;
        let campaign_id = self.resolve_campaign(user_id, request).await?;

        let plan = self
            .plan_resolver
            .resolve(
                &checkout.plan_name,
                checkout.price,
                checkout.billing_cycle,
                &checkout.features,
            )
            .await?;

        let customer_id = self.customer_binder.ensure_customer(&user).await?;
        let superseded_subscription_id = self.supersede_active_subscription(user_id).await?;

        let metadata = CheckoutMetadata {
            user_id,
            campaign_id,
            plan_id: plan.id,
            plan_name: Some(checkout.plan_name.clone()),
            billing_cycle: checkout.billing_cycle,
            amount: checkout.price,
            features: checkout.features.clone(),
            is_supersession: superseded_subscription_id.is_some(),
            superseded_subscription_id,
        };

        let session = self
            .stripe
            .create_checkout_session(CheckoutSessionRequest {
                customer_id: customer_id.clone(),
                plan_name: checkout.plan_name.clone(),
                unit_amount_minor: to_minor_units(checkout.price),
                currency: self.settings.currency.clone(),
                billing_cycle: checkout.billing_cycle,
                metadata: metadata.to_map(),
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %campaign_id,
                    plan_id = %plan.id,
                    %customer_id,
                    error = ?err,
                    "checkout: stripe checkout session creation failed"
                );
                BillingError::Provider(err)
            })?;

        info!(
            %user_id,
            %campaign_id,
            plan_id = %plan.id,
            session_id = %session.id,
            superseded = superseded_subscription_id.is_some(),
            "checkout: checkout session created"
        );

        Ok(CheckoutSessionDto {
            session_id: session.id,
            url: session.url,
        })
    }

    async fn load_user(&self, user_id: Uuid) -> UseCaseResult<UserEntity> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load user");
                BillingError::Internal(err)
            })?
            .ok_or_else(|| {
                error!(%user_id, "checkout: authenticated user has no account record");
                BillingError::Internal(anyhow::anyhow!("user {user_id} not found"))
            })
    }

    /// Uses the supplied campaign (updating its preferences when new ones are sent) or
    /// creates a draft campaign from the submitted preferences.
    async fn resolve_campaign(
        &self,
        user_id: Uuid,
        request: CreateCheckoutSessionRequest,
    ) -> UseCaseResult<Uuid> {
        if let Some(campaign_id) = request.campaign_id {
            let campaign = self
                .campaign_repo
                .find_for_user(campaign_id, user_id)
                .await
                .map_err(|err| {
                    error!(%user_id, %campaign_id, db_error = ?err, "checkout: failed to load campaign");
                    BillingError::Internal(err)
                })?
                .ok_or_else(|| {
                    warn!(%user_id, %campaign_id, "checkout: campaign not found for user");
                    BillingError::CampaignNotFound
                })?;

            if let Some(preferences) = request.preferences {
                let merged = preferences.apply_to(&campaign.preferences);
                self.campaign_repo
                    .update_preferences(campaign_id, merged)
                    .await
                    .map_err(|err| {
                        error!(%user_id, %campaign_id, db_error = ?err, "checkout: failed to update campaign preferences");
                        BillingError::Internal(err)
                    })?;
            }

            return Ok(campaign_id);
        }

        let preferences = request
            .preferences
            .ok_or_else(|| BillingError::validation("Campaign preferences are required"))?
            .into_preferences();

        let campaign = self
            .campaign_repo
            .create(InsertCampaignEntity::draft(user_id, &preferences))
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to create draft campaign");
                BillingError::Internal(err)
            })?;

        info!(%user_id, campaign_id = %campaign.id, "checkout: created draft campaign");
        Ok(campaign.id)
    }

    /// Retires the user's active subscription before a new one is sold. Provider-side
    /// cancellation is best-effort; the local status change is not.
    async fn supersede_active_subscription(&self, user_id: Uuid) -> UseCaseResult<Option<Uuid>> {
        let active = self
            .subscription_repo
            .find_active_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load active subscription");
                BillingError::Internal(err)
            })?;

        let Some(active) = active else {
            return Ok(None);
        };
        let subscription_id = active.id;

        if let Some(provider_subscription_id) = active.provider_subscription_id.as_deref() {
            if let Err(err) = self.stripe.cancel_subscription(provider_subscription_id).await {
                warn!(
                    %user_id,
                    %subscription_id,
                    provider_subscription_id,
                    error = ?err,
                    "checkout: failed to cancel superseded subscription at stripe"
                );
            }
        }

        self.subscription_repo
            .mark_cancelled(subscription_id)
            .await
            .map_err(|err| {
                error!(%user_id, %subscription_id, db_error = ?err, "checkout: failed to cancel superseded subscription");
                BillingError::Internal(err)
            })?;

        info!(%user_id, %subscription_id, "checkout: superseded active subscription");
        Ok(Some(subscription_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use boostline_core::{
        domain::{
            entities::{
                campaigns::CampaignEntity, plans::PlanEntity,
                subscriptions::SubscriptionEntity,
            },
            repositories::{
                campaigns::MockCampaignRepository, checkout_locks::MockCheckoutLockRepository,
                plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
                users::MockUserRepository,
            },
            value_objects::{
                campaigns::{CampaignMetrics, CampaignPreferences, CampaignPreferencesInput},
                enums::campaign_statuses::CampaignStatus,
                subscriptions::SubmittedPrice,
            },
        },
        payments::{
            errors::StripeError, gateway::MockStripeGateway,
            stripe_types::{CreatedCheckoutSession, StripeCustomer},
        },
    };
    use mockall::predicate::eq;

    struct Mocks {
        plans: MockPlanRepository,
        users: MockUserRepository,
        campaigns: MockCampaignRepository,
        subscriptions: MockSubscriptionRepository,
        locks: MockCheckoutLockRepository,
        stripe: MockStripeGateway,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                plans: MockPlanRepository::new(),
                users: MockUserRepository::new(),
                campaigns: MockCampaignRepository::new(),
                subscriptions: MockSubscriptionRepository::new(),
                locks: MockCheckoutLockRepository::new(),
                stripe: MockStripeGateway::new(),
            }
        }

        fn build(
            self,
        ) -> CheckoutUseCase<
            MockPlanRepository,
            MockUserRepository,
            MockCampaignRepository,
            MockSubscriptionRepository,
            MockCheckoutLockRepository,
            MockStripeGateway,
        > {
            CheckoutUseCase::new(
                Arc::new(self.plans),
                Arc::new(self.users),
                Arc::new(self.campaigns),
                Arc::new(self.subscriptions),
                Arc::new(self.locks),
                Arc::new(self.stripe),
                CheckoutSettings {
                    currency: "usd".to_string(),
                    lock_ttl: Duration::seconds(120),
                },
            )
        }
    }

    fn user(user_id: Uuid) -> UserEntity {
        UserEntity {
            id: user_id,
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            stripe_customer_id: Some("cus_live".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn plan(plan_id: Uuid) -> PlanEntity {
        PlanEntity {
            id: plan_id,
            name: "Pro".to_string(),
            monthly_price: 49.0,
            annual_price: 49.0 * 12.0 / 11.0,
            features: vec![],
            created_at: Utc::now(),
        }
    }

    fn campaign(campaign_id: Uuid, user_id: Uuid) -> CampaignEntity {
        CampaignEntity {
            id: campaign_id,
            user_id,
            subscription_id: None,
            status: CampaignStatus::Draft,
            preferences: CampaignPreferences::default(),
            metrics: CampaignMetrics::default(),
            started_at: None,
            ended_at: None,
            created_at: Utc::now(),
        }
    }

    fn active_subscription(user_id: Uuid) -> SubscriptionEntity {
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_id: Uuid::new_v4(),
            campaign_id: None,
            plan_name: "Starter".to_string(),
            amount_minor: 1900,
            currency: "usd".to_string(),
            billing_cycle: "monthly".to_string(),
            status: "active".to_string(),
            started_at: Utc::now(),
            next_billing_at: None,
            canceled_at: None,
            provider_subscription_id: Some("sub_old".to_string()),
            provider_customer_id: Some("cus_live".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(campaign_id: Option<Uuid>) -> CreateCheckoutSessionRequest {
        CreateCheckoutSessionRequest {
            plan_name: Some("Pro".to_string()),
            plan_price: Some(SubmittedPrice::Number(49.0)),
            billing_cycle: Some("monthly".to_string()),
            features: vec![],
            preferences: campaign_id.is_none().then(|| CampaignPreferencesInput {
                interests: Some(vec!["fitness".to_string()]),
                ..Default::default()
            }),
            campaign_id,
        }
    }

    fn expect_lock(mocks: &mut Mocks, user_id: Uuid) {
        mocks
            .locks
            .expect_try_acquire()
            .withf(move |id, _| *id == user_id)
            .times(1)
            .returning(|_, _| Ok(true));
        mocks
            .locks
            .expect_release()
            .with(eq(user_id))
            .times(1)
            .returning(|_| Ok(()));
    }

    fn expect_plan_and_customer(mocks: &mut Mocks, user_id: Uuid, plan_id: Uuid) {
        mocks
            .users
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |id| Ok(Some(user(id))));
        mocks
            .plans
            .expect_find_by_name()
            .returning(move |_| Ok(Some(plan(plan_id))));
        mocks.stripe.expect_retrieve_customer().returning(|id| {
            Ok(StripeCustomer {
                id: id.to_string(),
                deleted: false,
                email: None,
            })
        });
    }

    #[tokio::test]
    async fn creates_session_with_metadata_for_new_campaign() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lock(&mut mocks, user_id);
        expect_plan_and_customer(&mut mocks, user_id, plan_id);

        mocks
            .campaigns
            .expect_create()
            .withf(move |insert| {
                insert.user_id == user_id
                    && insert.status == "draft"
                    && insert.interests == serde_json::json!(["fitness"])
            })
            .times(1)
            .returning(move |insert| Ok(campaign(campaign_id, insert.user_id)));
        mocks
            .subscriptions
            .expect_find_active_by_user()
            .returning(|_| Ok(None));
        mocks.subscriptions.expect_mark_cancelled().never();
        mocks
            .stripe
            .expect_create_checkout_session()
            .withf(move |request| {
                let metadata = CheckoutMetadata::from_map(&request.metadata).unwrap();
                request.customer_id == "cus_live"
                    && request.unit_amount_minor == 4900
                    && request.currency == "usd"
                    && request.billing_cycle == BillingCycle::Monthly
                    && metadata.user_id == user_id
                    && metadata.campaign_id == campaign_id
                    && metadata.plan_id == plan_id
                    && metadata.amount == 49.0
                    && !metadata.is_supersession
            })
            .times(1)
            .returning(|_| {
                Ok(CreatedCheckoutSession {
                    id: "cs_test_1".to_string(),
                    url: Some("https://checkout.stripe.com/c/cs_test_1".to_string()),
                })
            });

        let dto = mocks
            .build()
            .create_checkout_session(user_id, request(None))
            .await
            .unwrap();

        assert_eq!(dto.session_id, "cs_test_1");
        assert!(dto.url.is_some());
    }

    #[tokio::test]
    async fn supersedes_active_subscription_even_when_provider_cancel_fails() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let existing = active_subscription(user_id);
        let existing_id = existing.id;
        let mut mocks = Mocks::new();
        expect_lock(&mut mocks, user_id);
        expect_plan_and_customer(&mut mocks, user_id, plan_id);

        mocks
            .campaigns
            .expect_find_for_user()
            .with(eq(campaign_id), eq(user_id))
            .returning(move |id, owner| Ok(Some(campaign(id, owner))));
        mocks
            .subscriptions
            .expect_find_active_by_user()
            .returning(move |_| Ok(Some(existing.clone())));
        mocks
            .stripe
            .expect_cancel_subscription()
            .withf(|id: &str| id == "sub_old")
            .times(1)
            .returning(|_| Err(StripeError::api(500, "stripe is down")));
        mocks
            .subscriptions
            .expect_mark_cancelled()
            .with(eq(existing_id))
            .times(1)
            .returning(|_| Ok(true));
        mocks
            .stripe
            .expect_create_checkout_session()
            .withf(move |request| {
                let metadata = CheckoutMetadata::from_map(&request.metadata).unwrap();
                metadata.is_supersession
                    && metadata.superseded_subscription_id == Some(existing_id)
            })
            .times(1)
            .returning(|_| {
                Ok(CreatedCheckoutSession {
                    id: "cs_test_2".to_string(),
                    url: None,
                })
            });

        let dto = mocks
            .build()
            .create_checkout_session(user_id, request(Some(campaign_id)))
            .await
            .unwrap();

        assert_eq!(dto.session_id, "cs_test_2");
    }

    #[tokio::test]
    async fn rejects_invalid_requests_before_any_side_effect() {
        let user_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks.locks.expect_try_acquire().never();
        mocks.stripe.expect_create_checkout_session().never();
        let usecase = mocks.build();

        let mut missing_name = request(None);
        missing_name.plan_name = Some("   ".to_string());
        let mut bad_price = request(None);
        bad_price.plan_price = Some(SubmittedPrice::Text("forty-nine".to_string()));
        let mut negative_price = request(None);
        negative_price.plan_price = Some(SubmittedPrice::Number(-1.0));
        let mut no_campaign = request(None);
        no_campaign.preferences = None;

        for invalid in [missing_name, bad_price, negative_price, no_campaign] {
            let err = usecase
                .create_checkout_session(user_id, invalid)
                .await
                .unwrap_err();
            assert!(matches!(err, BillingError::Validation { .. }));
        }
    }

    #[tokio::test]
    async fn held_lock_yields_checkout_in_progress() {
        let user_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks
            .locks
            .expect_try_acquire()
            .returning(|_, _| Ok(false));
        mocks.locks.expect_release().never();
        mocks.users.expect_find_by_id().never();

        let err = mocks
            .build()
            .create_checkout_session(user_id, request(None))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::CheckoutInProgress));
    }

    #[tokio::test]
    async fn foreign_campaign_is_not_found_and_lock_is_released() {
        let user_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lock(&mut mocks, user_id);
        mocks
            .users
            .expect_find_by_id()
            .returning(move |id| Ok(Some(user(id))));
        mocks
            .campaigns
            .expect_find_for_user()
            .returning(|_, _| Ok(None));
        mocks.stripe.expect_create_checkout_session().never();

        let err = mocks
            .build()
            .create_checkout_session(user_id, request(Some(Uuid::new_v4())))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::CampaignNotFound));
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_provider_error() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lock(&mut mocks, user_id);
        expect_plan_and_customer(&mut mocks, user_id, plan_id);
        mocks
            .campaigns
            .expect_create()
            .returning(move |insert| Ok(campaign(Uuid::new_v4(), insert.user_id)));
        mocks
            .subscriptions
            .expect_find_active_by_user()
            .returning(|_| Ok(None));
        mocks
            .stripe
            .expect_create_checkout_session()
            .returning(|_| Err(StripeError::api(400, "Invalid currency")));

        let err = mocks
            .build()
            .create_checkout_session(user_id, request(None))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Provider(_)));
        assert!(err.detail().unwrap().contains("Invalid currency"));
    }

    #[tokio::test]
    async fn lock_acquire_failure_is_internal() {
        let mut mocks = Mocks::new();
        mocks
            .locks
            .expect_try_acquire()
            .returning(|_, _| Err(anyhow!("connection refused")));

        let err = mocks
            .build()
            .create_checkout_session(Uuid::new_v4(), request(None))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Internal(_)));
    }
}
