use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::enums::billing_cycles::BillingCycle;

/// Annual commitment is priced as twelve months over eleven (one month free).
const MONTHS_PER_YEAR: f64 = 12.0;
const BILLED_MONTHS_PER_YEAR: f64 = 11.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriceError {
    #[error("plan price must be a finite number")]
    NotFinite,
    #[error("plan price must be a valid positive number")]
    NotPositive,
}

pub fn validate_price(price: f64) -> Result<f64, PriceError> {
    if !price.is_finite() {
        return Err(PriceError::NotFinite);
    }
    if price <= 0.0 {
        return Err(PriceError::NotPositive);
    }
    Ok(price)
}

/// Monthly and annual prices stored on a plan the first time it is checked out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanPricing {
    pub monthly_price: f64,
    pub annual_price: f64,
}

impl PlanPricing {
    /// Derives the counterpart price from the one submitted at checkout.
    pub fn derive(price: f64, billing_cycle: BillingCycle) -> Result<Self, PriceError> {
        let price = validate_price(price)?;

        Ok(match billing_cycle {
            BillingCycle::Monthly => Self {
                monthly_price: price,
                annual_price: price * MONTHS_PER_YEAR / BILLED_MONTHS_PER_YEAR,
            },
            BillingCycle::Annual => Self {
                monthly_price: price / MONTHS_PER_YEAR,
                annual_price: price,
            },
        })
    }
}
