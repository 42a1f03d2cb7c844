use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Some(BillingCycle::Monthly),
            "annual" | "annually" | "yearly" | "year" => Some(BillingCycle::Annual),
            _ => None,
        }
    }

    /// Recurring interval understood by Stripe prices.
    pub fn stripe_interval(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "month",
            BillingCycle::Annual => "year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "Monthly",
            BillingCycle::Annual => "Annual",
        }
    }
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_spellings() {
        assert_eq!(BillingCycle::from_str("monthly"), Some(BillingCycle::Monthly));
        assert_eq!(BillingCycle::from_str(" Annual "), Some(BillingCycle::Annual));
        assert_eq!(BillingCycle::from_str("yearly"), Some(BillingCycle::Annual));
        assert_eq!(BillingCycle::from_str("weekly"), None);
    }

    #[test]
    fn maps_to_stripe_interval() {
        assert_eq!(BillingCycle::Monthly.stripe_interval(), "month");
        assert_eq!(BillingCycle::Annual.stripe_interval(), "year");
    }
}
