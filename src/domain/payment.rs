use super::booking::{Booking, PaymentStatus};
use super::BookingId;
use crate::error::{MarketplaceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const META_BOOKING_ID: &str = "bookingId";
pub const META_USER_ID: &str = "userId";
pub const META_SERVICE_ID: &str = "serviceId";
pub const META_PROVIDER_ID: &str = "providerId";

/// Request to open a charge attempt with the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentIntent {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

impl NewPaymentIntent {
    /// Builds the intent for a booking, tagged so processor events can be
    /// correlated back to it.
    pub fn for_booking(booking: &Booking, currency: &str) -> Result<Self> {
        let metadata = HashMap::from([
            (META_BOOKING_ID.to_string(), booking.id.to_string()),
            (META_USER_ID.to_string(), booking.user_id.to_string()),
            (META_SERVICE_ID.to_string(), booking.service_id.to_string()),
            (META_PROVIDER_ID.to_string(), booking.provider_id.to_string()),
        ]);
        Ok(Self {
            amount: booking.amount.minor_units()?,
            currency: currency.to_lowercase(),
            metadata,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// Payment status this processor state settles on, if it is terminal
    /// for the current attempt.
    pub fn outcome(self) -> Option<PaymentStatus> {
        match self {
            IntentStatus::Succeeded => Some(PaymentStatus::Paid),
            IntentStatus::RequiresPaymentMethod | IntentStatus::Canceled => {
                Some(PaymentStatus::Failed)
            }
            _ => None,
        }
    }
}

/// The processor's view of a charge attempt.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created: i64,
}

impl PaymentIntent {
    pub fn booking_id(&self) -> Option<BookingId> {
        self.metadata
            .get(META_BOOKING_ID)
            .and_then(|raw| raw.trim().parse().ok())
    }
}

/// A verified processor notification about a payment intent.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentEvent {
    pub event_id: String,
    pub occurred_at: DateTime<Utc>,
    pub intent: PaymentIntent,
}

/// Webhook payloads decoded into the shapes this service acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Succeeded(IntentEvent),
    Failed(IntentEvent),
    /// Any event type that does not drive a booking transition.
    Ignored { event_id: String, kind: String },
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    created: i64,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

pub const EVENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

impl PaymentEvent {
    /// Validates the event shape before anything dispatches on it.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let envelope: EventEnvelope = serde_json::from_slice(payload).map_err(|e| {
            MarketplaceError::ValidationError(format!("Malformed webhook event: {e}"))
        })?;

        let succeeded = match envelope.kind.as_str() {
            EVENT_INTENT_SUCCEEDED => true,
            EVENT_INTENT_FAILED => false,
            _ => {
                return Ok(PaymentEvent::Ignored {
                    event_id: envelope.id,
                    kind: envelope.kind,
                });
            }
        };

        let intent: PaymentIntent = serde_json::from_value(envelope.data.object).map_err(|e| {
            MarketplaceError::ValidationError(format!("Malformed payment intent: {e}"))
        })?;
        let occurred_at = DateTime::from_timestamp(envelope.created, 0).ok_or_else(|| {
            MarketplaceError::ValidationError(format!(
                "Invalid event timestamp: {}",
                envelope.created
            ))
        })?;
        let event = IntentEvent {
            event_id: envelope.id,
            occurred_at,
            intent,
        };

        Ok(if succeeded {
            PaymentEvent::Succeeded(event)
        } else {
            PaymentEvent::Failed(event)
        })
    }
}
