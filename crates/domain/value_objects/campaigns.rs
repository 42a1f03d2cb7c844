use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Demographics {
    #[serde(default)]
    pub age: Vec<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialAccount {
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl Default for SocialAccount {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            username: None,
        }
    }
}

fn default_platform() -> String {
    "instagram".to_string()
}

/// Targeting preferences persisted on a campaign.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignPreferences {
    pub demographics: Demographics,
    pub interests: Vec<String>,
    pub behaviors: Vec<String>,
    pub social_account: SocialAccount,
}

/// Preferences as submitted by the client; every block is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignPreferencesInput {
    #[serde(default)]
    pub demographics: Option<Demographics>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub behaviors: Option<Vec<String>>,
    #[serde(default, alias = "socialMedia", alias = "social_media")]
    pub social_account: Option<SocialAccount>,
}

impl CampaignPreferencesInput {
    pub fn into_preferences(self) -> CampaignPreferences {
        CampaignPreferences {
            demographics: self.demographics.unwrap_or_default(),
            interests: self.interests.unwrap_or_default(),
            behaviors: self.behaviors.unwrap_or_default(),
            social_account: self.social_account.unwrap_or_default(),
        }
    }

    /// Overlays the submitted blocks on top of already stored preferences.
    pub fn apply_to(self, current: &CampaignPreferences) -> CampaignPreferences {
        CampaignPreferences {
            demographics: self
                .demographics
                .unwrap_or_else(|| current.demographics.clone()),
            interests: self.interests.unwrap_or_else(|| current.interests.clone()),
            behaviors: self.behaviors.unwrap_or_else(|| current.behaviors.clone()),
            social_account: self
                .social_account
                .unwrap_or_else(|| current.social_account.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignMetrics {
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub engagements: i64,
    #[serde(default)]
    pub followers: i64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_to_keeps_blocks_that_were_not_submitted() {
        let current = CampaignPreferences {
            demographics: Demographics {
                age: vec!["18-24".to_string()],
                gender: Some("any".to_string()),
                location: Some("Berlin".to_string()),
            },
            interests: vec!["fitness".to_string()],
            behaviors: vec!["early adopters".to_string()],
            social_account: SocialAccount {
                platform: "instagram".to_string(),
                username: Some("gym_owner".to_string()),
            },
        };

        let input = CampaignPreferencesInput {
            interests: Some(vec!["nutrition".to_string()]),
            ..Default::default()
        };

        let merged = input.apply_to(&current);

        assert_eq!(merged.interests, vec!["nutrition".to_string()]);
        assert_eq!(merged.demographics, current.demographics);
        assert_eq!(merged.behaviors, current.behaviors);
        assert_eq!(merged.social_account, current.social_account);
    }

    #[test]
    fn social_media_alias_and_platform_default() {
        let input: CampaignPreferencesInput =
            serde_json::from_str(r#"{ "socialMedia": { "username": "coffee_lab" } }"#).unwrap();

        let preferences = input.into_preferences();
        assert_eq!(preferences.social_account.platform, "instagram");
        assert_eq!(
            preferences.social_account.username.as_deref(),
            Some("coffee_lab")
        );
    }
}
