use super::AppState;
use super::error::ApiError;
use super::extractors::{CurrentUser, JsonBody};
use crate::application::{CheckoutTicket, WebhookReceipt};
use crate::domain::BookingId;
use crate::infrastructure::stripe::SIGNATURE_HEADER;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub booking_id: BookingId,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<PaymentIntentRequest>,
) -> Result<Json<CheckoutTicket>, ApiError> {
    let ticket = state
        .payments
        .create_payment_intent(request.booking_id, user.id)
        .await?;
    Ok(Json(ticket))
}

/// Processor webhook. The raw body is needed byte-for-byte to check the
/// signature, so it is taken as `Bytes` rather than JSON.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = match state.payments.handle_webhook_event(&body, signature).await? {
        WebhookReceipt::Reconciled(_) => "reconciled",
        WebhookReceipt::Ignored { .. } => "ignored",
        WebhookReceipt::Unmatched { .. } => "unmatched",
    };
    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}
