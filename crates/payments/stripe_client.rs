use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{
    RequestBuilder, Response,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, de::DeserializeOwned};
use sha2::Sha256;
use tracing::error;
use uuid::Uuid;

use crate::payments::{
    errors::StripeError,
    stripe_types::{
        CheckoutSessionRequest, CreatedCheckoutSession, StripeCheckoutSession, StripeCustomer,
        StripeEvent, StripeList, StripeSubscription,
    },
};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    webhook_tolerance_secs: i64,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

impl StripeClient {
    pub fn new(
        secret_key: String,
        webhook_secret: String,
        webhook_tolerance_secs: i64,
        success_url: String,
        cancel_url: String,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build stripe http client")?;

        Ok(Self {
            http,
            secret_key,
            webhook_secret,
            webhook_tolerance_secs,
            success_url,
            cancel_url,
        })
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, StripeError> {
        let resp = request
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(|source| StripeError::Transport {
                context: context.to_string(),
                source,
            })?;

        Self::ensure_success(resp, context).await
    }

    async fn decode<T: DeserializeOwned>(resp: Response, context: &str) -> Result<T, StripeError> {
        resp.json::<T>()
            .await
            .map_err(|err| StripeError::Decode(format!("{context}: {err}")))
    }

    async fn ensure_success(resp: Response, context: &str) -> Result<Response, StripeError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .map(|envelope| envelope.error)
            .ok();
        let (error_type, code, message, param) = match details {
            Some(details) => (details.type_, details.code, details.message, details.param),
            None => (None, None, None, None),
        };

        if status == reqwest::StatusCode::NOT_FOUND || code.as_deref() == Some("resource_missing") {
            return Err(StripeError::NotFound {
                context: context.to_string(),
            });
        }

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?error_type,
            stripe_error_code = ?code,
            stripe_error_param = ?param,
            stripe_error_message = ?message,
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        Err(StripeError::Api {
            context: context.to_string(),
            status: status.as_u16(),
            error_type,
            code,
            message,
            request_id,
        })
    }

    pub async fn create_customer(
        &self,
        email: &str,
        name: &str,
        user_id: Uuid,
    ) -> Result<String, StripeError> {
        // https://stripe.com/docs/api/customers/create
        let body = [
            ("email", email.to_string()),
            ("name", name.to_string()),
            ("metadata[user_id]", user_id.to_string()),
        ];

        let request = self
            .http
            .post(format!("{API_BASE}/customers"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body);
        let resp = self.send(request, "create customer").await?;

        let customer: StripeCustomer = Self::decode(resp, "create customer").await?;
        Ok(customer.id)
    }

    /// Deleted customers are reported as not found.
    pub async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer, StripeError> {
        let request = self.http.get(format!("{API_BASE}/customers/{customer_id}"));
        let resp = self.send(request, "retrieve customer").await?;

        let customer: StripeCustomer = Self::decode(resp, "retrieve customer").await?;
        if customer.deleted {
            return Err(StripeError::not_found("retrieve customer (deleted)"));
        }

        Ok(customer)
    }

    /// Lists up to `limit` customers; used as a cheap authenticated connectivity check.
    pub async fn list_customers(&self, limit: u8) -> Result<Vec<StripeCustomer>, StripeError> {
        let request = self
            .http
            .get(format!("{API_BASE}/customers"))
            .query(&[("limit", limit.to_string())]);
        let resp = self.send(request, "list customers").await?;

        let list: StripeList<StripeCustomer> = Self::decode(resp, "list customers").await?;
        Ok(list.data)
    }

    /// Opens a subscription-mode Checkout Session priced inline for the requested cadence.
    pub async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, StripeError> {
        // https://stripe.com/docs/api/checkout/sessions/create
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("customer".to_string(), request.customer_id.clone()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.unit_amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][recurring][interval]".to_string(),
                request.billing_cycle.stripe_interval().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        for (key, value) in &request.metadata {
            body.push((format!("metadata[{key}]"), value.clone()));
            body.push((format!("subscription_data[metadata][{key}]"), value.clone()));
        }

        let http_request = self
            .http
            .post(format!("{API_BASE}/checkout/sessions"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body);
        let resp = self.send(http_request, "create checkout session").await?;

        Self::decode(resp, "create checkout session").await
    }

    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<StripeCheckoutSession, StripeError> {
        let request = self
            .http
            .get(format!("{API_BASE}/checkout/sessions/{session_id}"));
        let resp = self.send(request, "retrieve checkout session").await?;

        Self::decode(resp, "retrieve checkout session").await
    }

    pub async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, StripeError> {
        // https://stripe.com/docs/api/subscriptions/retrieve
        let request = self
            .http
            .get(format!("{API_BASE}/subscriptions/{subscription_id}"));
        let resp = self.send(request, "retrieve subscription").await?;

        Self::decode(resp, "retrieve subscription").await
    }

    /// Cancels the subscription immediately.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), StripeError> {
        // https://stripe.com/docs/api/subscriptions/cancel
        let request = self
            .http
            .delete(format!("{API_BASE}/subscriptions/{subscription_id}"));
        self.send(request, "cancel subscription").await?;

        Ok(())
    }

    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<StripeSubscription, StripeError> {
        let body = [("cancel_at_period_end", cancel_at_period_end.to_string())];
        let request = self
            .http
            .post(format!("{API_BASE}/subscriptions/{subscription_id}"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body);
        let resp = self.send(request, "update subscription").await?;

        Self::decode(resp, "update subscription").await
    }

    /// Verifies the `Stripe-Signature` header against the raw body and decodes the event.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeError> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            self.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )?;

        serde_json::from_slice(payload)
            .map_err(|err| StripeError::Decode(format!("webhook event: {err}")))
    }
}

/// Checks a `t=..,v1=..` signature header. Any matching `v1` entry is accepted.
/// https://stripe.com/docs/webhooks/signatures
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeError::Signature("missing timestamp in stripe-signature".into()))?;
    if signatures.is_empty() {
        return Err(StripeError::Signature(
            "missing v1 in stripe-signature".into(),
        ));
    }

    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::Signature(format!("invalid timestamp {timestamp}")))?;
    if now.abs_diff(signed_at) > tolerance_secs.max(0).unsigned_abs() {
        return Err(StripeError::Signature(
            "timestamp outside the tolerance zone".into(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| StripeError::Signature(format!("invalid webhook secret: {err}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|signature| {
        hex::decode(signature)
            .map(|provided| mac.clone().verify_slice(&provided).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        return Err(StripeError::Signature(
            "no signatures found matching the expected signature for payload".into(),
        ));
    }

    Ok(())
}
