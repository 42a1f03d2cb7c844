use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("stripe resource not found during {context}")]
    NotFound { context: String },
    #[error(
        "stripe api request failed during {context} (status {status}, code {code:?}, request_id={request_id:?}): {}",
        .message.as_deref().unwrap_or("<no message>")
    )]
    Api {
        context: String,
        status: u16,
        error_type: Option<String>,
        code: Option<String>,
        message: Option<String>,
        request_id: Option<String>,
    },
    #[error("stripe request failed during {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode stripe payload: {0}")]
    Decode(String),
    #[error("stripe signature rejected: {0}")]
    Signature(String),
}

impl StripeError {
    /// Whether the provider reported the referenced object as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StripeError::NotFound { .. })
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        StripeError::NotFound {
            context: context.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        StripeError::Api {
            context: "api".to_string(),
            status,
            error_type: None,
            code: None,
            message: Some(message.into()),
            request_id: None,
        }
    }
}
