use std::sync::Arc;

use boostline_core::domain::{
    entities::plans::{InsertPlanEntity, PlanEntity},
    repositories::plans::PlanRepository,
    value_objects::{enums::billing_cycles::BillingCycle, plans::PlanPricing},
};
use serde_json::json;
use tracing::{error, info};

use super::errors::{BillingError, UseCaseResult};

/// Finds a plan by name, creating it from the submitted checkout price when missing.
pub struct PlanResolver<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
}

impl<P> PlanResolver<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(plan_repo: Arc<P>) -> Self {
        Self { plan_repo }
    }

    /// An existing plan is returned as stored, even when its prices differ from `price`.
    pub async fn resolve(
        &self,
        name: &str,
        price: f64,
        billing_cycle: BillingCycle,
        features: &[String],
    ) -> UseCaseResult<PlanEntity> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BillingError::validation("Plan name is required"));
        }
        let pricing = PlanPricing::derive(price, billing_cycle)
            .map_err(|err| BillingError::validation(err.to_string()))?;

        let existing = self.plan_repo.find_by_name(name).await.map_err(|err| {
            error!(plan_name = name, db_error = ?err, "plan_resolver: failed to look up plan");
            BillingError::Internal(err)
        })?;
        if let Some(plan) = existing {
            return Ok(plan);
        }

        let created = self
            .plan_repo
            .create(InsertPlanEntity {
                name: name.to_string(),
                monthly_price: pricing.monthly_price,
                annual_price: pricing.annual_price,
                features: json!(features),
            })
            .await
            .map_err(|err| {
                error!(plan_name = name, db_error = ?err, "plan_resolver: failed to create plan");
                BillingError::Validation {
                    message: "Failed to create plan".to_string(),
                    detail: Some(format!("{err:#}")),
                }
            })?;

        let Some(plan) = created else {
            // A concurrent checkout inserted the same name first.
            info!(plan_name = name, "plan_resolver: plan created concurrently; reusing it");
            return self
                .plan_repo
                .find_by_name(name)
                .await
                .map_err(|err| {
                    error!(plan_name = name, db_error = ?err, "plan_resolver: failed to reload plan");
                    BillingError::Internal(err)
                })?
                .ok_or_else(|| {
                    BillingError::Internal(anyhow::anyhow!(
                        "plan {name} conflicted on insert but was not found"
                    ))
                });
        };

        info!(
            plan_id = %plan.id,
            plan_name = %plan.name,
            monthly_price = plan.monthly_price,
            annual_price = plan.annual_price,
            "plan_resolver: created plan"
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use boostline_core::domain::repositories::plans::MockPlanRepository;
    use chrono::Utc;
    use uuid::Uuid;

    fn plan(name: &str, monthly_price: f64, annual_price: f64) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            monthly_price,
            annual_price,
            features: vec!["Targeted growth".to_string()],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn returns_existing_plan_without_updating_prices() {
        let stored = plan("Pro", 39.0, 425.45);
        let expected = stored.clone();

        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_name()
            .withf(|name: &str| name == "Pro")
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));
        plan_repo.expect_create().never();

        let resolver = PlanResolver::new(Arc::new(plan_repo));
        let resolved = resolver
            .resolve("  Pro ", 49.0, BillingCycle::Monthly, &[])
            .await
            .unwrap();

        assert_eq!(resolved, expected);
    }

    #[tokio::test]
    async fn creates_plan_with_derived_annual_price() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_name().returning(|_| Ok(None));
        plan_repo
            .expect_create()
            .withf(|insert| {
                insert.name == "Pro"
                    && insert.monthly_price == 49.0
                    && (insert.annual_price - 49.0 * 12.0 / 11.0).abs() < 1e-9
                    && insert.features == json!(["Targeted growth"])
            })
            .times(1)
            .returning(|insert| {
                Ok(Some(plan(&insert.name, insert.monthly_price, insert.annual_price)))
            });

        let resolver = PlanResolver::new(Arc::new(plan_repo));
        let resolved = resolver
            .resolve(
                "Pro",
                49.0,
                BillingCycle::Monthly,
                &["Targeted growth".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(resolved.name, "Pro");
    }

    #[tokio::test]
    async fn annual_price_derives_monthly() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_name().returning(|_| Ok(None));
        plan_repo
            .expect_create()
            .withf(|insert| insert.annual_price == 528.0 && insert.monthly_price == 44.0)
            .times(1)
            .returning(|insert| {
                Ok(Some(plan(&insert.name, insert.monthly_price, insert.annual_price)))
            });

        let resolver = PlanResolver::new(Arc::new(plan_repo));
        let resolved = resolver
            .resolve("Growth", 528.0, BillingCycle::Annual, &[])
            .await
            .unwrap();

        assert_eq!(resolved.monthly_price, 44.0);
    }

    #[tokio::test]
    async fn rejects_invalid_input_before_touching_storage() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_name().never();
        plan_repo.expect_create().never();
        let resolver = PlanResolver::new(Arc::new(plan_repo));

        for (name, price) in [("", 49.0), ("Pro", 0.0), ("Pro", -5.0), ("Pro", f64::NAN)] {
            let err = resolver
                .resolve(name, price, BillingCycle::Monthly, &[])
                .await
                .unwrap_err();
            assert!(matches!(err, BillingError::Validation { .. }), "{name} {price}");
        }
    }

    #[tokio::test]
    async fn name_conflict_on_create_returns_the_concurrent_plan() {
        let winner = plan("Pro", 49.0, 534.55);
        let expected = winner.clone();

        let mut plan_repo = MockPlanRepository::new();
        let mut lookups = 0;
        plan_repo
            .expect_find_by_name()
            .times(2)
            .returning(move |_| {
                lookups += 1;
                Ok((lookups > 1).then(|| winner.clone()))
            });
        plan_repo.expect_create().times(1).returning(|_| Ok(None));

        let resolver = PlanResolver::new(Arc::new(plan_repo));
        let resolved = resolver
            .resolve("Pro", 49.0, BillingCycle::Monthly, &[])
            .await
            .unwrap();

        assert_eq!(resolved, expected);
    }

    #[tokio::test]
    async fn creation_failure_is_a_validation_error_with_detail() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_name().returning(|_| Ok(None));
        plan_repo
            .expect_create()
            .returning(|_| Err(anyhow!("violates check constraint plans_name_check")));

        let resolver = PlanResolver::new(Arc::new(plan_repo));
        let err = resolver
            .resolve("Pro", 49.0, BillingCycle::Monthly, &[])
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.detail().unwrap().contains("plans_name_check"));
    }
}
