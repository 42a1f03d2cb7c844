use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::domain::value_objects::{
    campaigns::{CampaignMetrics, CampaignPreferences},
    enums::campaign_statuses::CampaignStatus,
};
use crate::infra::db::postgres::schema::campaigns;

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub status: CampaignStatus,
    pub preferences: CampaignPreferences,
    pub metrics: CampaignMetrics,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Raw row; the preference blocks are JSONB columns.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = campaigns)]
pub struct CampaignRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub status: String,
    pub demographics: serde_json::Value,
    pub interests: serde_json::Value,
    pub behaviors: serde_json::Value,
    pub social_account: serde_json::Value,
    pub metrics: serde_json::Value,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CampaignRow> for CampaignEntity {
    fn from(value: CampaignRow) -> Self {
        let preferences = CampaignPreferences {
            demographics: serde_json::from_value(value.demographics).unwrap_or_default(),
            interests: serde_json::from_value(value.interests).unwrap_or_default(),
            behaviors: serde_json::from_value(value.behaviors).unwrap_or_default(),
            social_account: serde_json::from_value(value.social_account).unwrap_or_default(),
        };

        Self {
            id: value.id,
            user_id: value.user_id,
            subscription_id: value.subscription_id,
            status: CampaignStatus::from_str(&value.status),
            preferences,
            metrics: serde_json::from_value(value.metrics).unwrap_or_default(),
            started_at: value.started_at,
            ended_at: value.ended_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = campaigns)]
pub struct InsertCampaignEntity {
    pub user_id: Uuid,
    pub status: String,
    pub demographics: serde_json::Value,
    pub interests: serde_json::Value,
    pub behaviors: serde_json::Value,
    pub social_account: serde_json::Value,
    pub metrics: serde_json::Value,
}

impl InsertCampaignEntity {
    pub fn draft(user_id: Uuid, preferences: &CampaignPreferences) -> Self {
        Self {
            user_id,
            status: CampaignStatus::Draft.to_string(),
            demographics: json!(preferences.demographics),
            interests: json!(preferences.interests),
            behaviors: json!(preferences.behaviors),
            social_account: json!(preferences.social_account),
            metrics: json!(CampaignMetrics::default()),
        }
    }
}
