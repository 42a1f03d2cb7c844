use axum::http::StatusCode;
use boostline_core::payments::errors::StripeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{message}")]
    Validation {
        message: String,
        detail: Option<String>,
    },
    #[error("campaign not found")]
    CampaignNotFound,
    #[error("no active subscription")]
    SubscriptionNotFound,
    #[error("checkout session not found")]
    CheckoutSessionNotFound,
    #[error("a checkout is already in progress for this user")]
    CheckoutInProgress,
    #[error("payment has not been completed")]
    PaymentNotCompleted,
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("webhook signature rejected: {0}")]
    SignatureRejected(String),
    #[error("billing provider request failed")]
    Provider(#[source] StripeError),
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation {
            message: message.into(),
            detail: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Validation { .. }
            | BillingError::PaymentNotCompleted
            | BillingError::InvalidWebhook(_)
            | BillingError::SignatureRejected(_) => StatusCode::BAD_REQUEST,
            BillingError::CampaignNotFound
            | BillingError::SubscriptionNotFound
            | BillingError::CheckoutSessionNotFound => StatusCode::NOT_FOUND,
            BillingError::CheckoutInProgress => StatusCode::CONFLICT,
            BillingError::Provider(_) => StatusCode::BAD_GATEWAY,
            BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic detail for non-production responses.
    pub fn detail(&self) -> Option<String> {
        match self {
            BillingError::Validation { detail, .. } => detail.clone(),
            BillingError::Provider(err) => Some(err.to_string()),
            BillingError::Internal(err) => Some(format!("{err:#}")),
            _ => None,
        }
    }
}

impl From<StripeError> for BillingError {
    fn from(err: StripeError) -> Self {
        BillingError::Provider(err)
    }
}

impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        BillingError::Internal(err)
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BillingError>;
