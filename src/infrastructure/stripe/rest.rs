use crate::domain::payment::{NewPaymentIntent, PaymentIntent};
use crate::domain::ports::PaymentGateway;
use crate::error::{MarketplaceError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Talks to the Stripe REST API with a secret key.
#[derive(Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketplaceError::PaymentProviderError(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: STRIPE_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn form_for(intent: &NewPaymentIntent) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), intent.amount.to_string()),
            ("currency".to_string(), intent.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        let mut metadata: Vec<_> = intent.metadata.iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }

    async fn decode(response: reqwest::Response) -> Result<PaymentIntent> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<PaymentIntent>()
                .await
                .map_err(|e| MarketplaceError::PaymentProviderError(e.to_string()));
        }
        let detail = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .map(|body| {
                format!(
                    "{}: {}",
                    body.error.kind.unwrap_or_else(|| "api_error".to_string()),
                    body.error.message.unwrap_or_default()
                )
            })
            .unwrap_or_else(|| "unreadable error body".to_string());
        Err(MarketplaceError::PaymentProviderError(format!(
            "{status} {detail}"
        )))
    }
}

fn ensure_intent_id(intent_id: &str) -> Result<()> {
    let well_formed = !intent_id.is_empty()
        && intent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(MarketplaceError::ValidationError(
            "Invalid payment intent id".to_string(),
        ))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent> {
        let response = self
            .http
            .post(format!("{}/payment_intents", self.base_url))
            .bearer_auth(&self.api_key)
            .form(&Self::form_for(&intent))
            .send()
            .await
            .map_err(|e| MarketplaceError::PaymentProviderError(e.to_string()))?;
        Self::decode(response).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        ensure_intent_id(intent_id)?;
        let response = self
            .http
            .get(format!("{}/payment_intents/{intent_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| MarketplaceError::PaymentProviderError(e.to_string()))?;
        // An id the processor does not know came from the client.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketplaceError::ValidationError(format!(
                "No such payment intent: {intent_id}"
            )));
        }
        Self::decode(response).await
    }
}
