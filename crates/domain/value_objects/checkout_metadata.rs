use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::enums::billing_cycles::BillingCycle;

const USER_ID: &str = "user_id";
const CAMPAIGN_ID: &str = "campaign_id";
const PLAN_ID: &str = "plan_id";
const PLAN_NAME: &str = "plan_name";
const BILLING_CYCLE: &str = "billing_cycle";
const AMOUNT: &str = "amount";
const FEATURES: &str = "features";
const IS_SUPERSESSION: &str = "is_supersession";
const SUPERSEDED_SUBSCRIPTION_ID: &str = "superseded_subscription_id";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("checkout metadata is missing")]
    Absent,
    #[error("missing required metadata field `{0}`")]
    Missing(&'static str),
    #[error("invalid metadata field `{field}`: {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// Everything the asynchronous processor needs to materialize a completed checkout.
///
/// Stripe only knows the cadence and amount of a session, so this is attached to the
/// session as string metadata when it is created and read back from the webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutMetadata {
    pub user_id: Uuid,
    pub campaign_id: Uuid,
    pub plan_id: Uuid,
    pub plan_name: Option<String>,
    pub billing_cycle: BillingCycle,
    pub amount: f64,
    pub features: Vec<String>,
    pub is_supersession: bool,
    pub superseded_subscription_id: Option<Uuid>,
}

impl CheckoutMetadata {
    pub fn to_map(&self) -> HashMap<String, String> {
        HashMap::from([
            (USER_ID.to_string(), self.user_id.to_string()),
            (CAMPAIGN_ID.to_string(), self.campaign_id.to_string()),
            (PLAN_ID.to_string(), self.plan_id.to_string()),
            (
                PLAN_NAME.to_string(),
                self.plan_name.clone().unwrap_or_default(),
            ),
            (BILLING_CYCLE.to_string(), self.billing_cycle.to_string()),
            (AMOUNT.to_string(), self.amount.to_string()),
            (
                FEATURES.to_string(),
                serde_json::to_string(&self.features).unwrap_or_else(|_| "[]".to_string()),
            ),
            (IS_SUPERSESSION.to_string(), self.is_supersession.to_string()),
            (
                SUPERSEDED_SUBSCRIPTION_ID.to_string(),
                self.superseded_subscription_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            ),
        ])
    }

    pub fn from_map(metadata: &HashMap<String, String>) -> Result<Self, MetadataError> {
        if metadata.is_empty() {
            return Err(MetadataError::Absent);
        }

        let user_id = required_uuid(metadata, USER_ID)?;
        let campaign_id = required_uuid(metadata, CAMPAIGN_ID)?;
        let plan_id = required_uuid(metadata, PLAN_ID)?;

        let billing_cycle = match non_empty(metadata, BILLING_CYCLE) {
            Some(raw) => BillingCycle::from_str(raw).ok_or_else(|| MetadataError::Invalid {
                field: BILLING_CYCLE,
                value: raw.to_string(),
            })?,
            None => BillingCycle::Monthly,
        };

        let raw_amount = non_empty(metadata, AMOUNT).ok_or(MetadataError::Missing(AMOUNT))?;
        let amount = raw_amount
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or_else(|| MetadataError::Invalid {
                field: AMOUNT,
                value: raw_amount.to_string(),
            })?;

        let features = non_empty(metadata, FEATURES)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .unwrap_or_default();

        let is_supersession = non_empty(metadata, IS_SUPERSESSION) == Some("true");
        let superseded_subscription_id = match non_empty(metadata, SUPERSEDED_SUBSCRIPTION_ID) {
            Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| MetadataError::Invalid {
                field: SUPERSEDED_SUBSCRIPTION_ID,
                value: raw.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            user_id,
            campaign_id,
            plan_id,
            plan_name: non_empty(metadata, PLAN_NAME).map(str::to_string),
            billing_cycle,
            amount,
            features,
            is_supersession,
            superseded_subscription_id,
        })
    }
}

fn non_empty<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn required_uuid(
    metadata: &HashMap<String, String>,
    field: &'static str,
) -> Result<Uuid, MetadataError> {
    let raw = non_empty(metadata, field).ok_or(MetadataError::Missing(field))?;
    Uuid::parse_str(raw).map_err(|_| MetadataError::Invalid {
        field,
        value: raw.to_string(),
    })
}
