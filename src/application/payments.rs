use super::bookings::BookingManager;
use crate::domain::booking::{Booking, BookingStatus, PaymentStatus, Requester};
use crate::domain::payment::{NewPaymentIntent, PaymentEvent};
use crate::domain::ports::PaymentGatewayRef;
use crate::domain::{BookingId, UserId};
use crate::error::{MarketplaceError, Result};
use crate::infrastructure::stripe::WebhookVerifier;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CURRENCY: &str = "inr";

/// What the client needs to complete checkout on the processor's page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTicket {
    pub client_secret: String,
    pub booking_id: BookingId,
    pub payment_intent_id: String,
}

/// Outcome of a verified webhook delivery. Every variant is acknowledged to
/// the processor.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookReceipt {
    /// The event was reconciled against a booking (possibly as a no-op).
    Reconciled(Booking),
    /// An event type that drives no transition.
    Ignored { event_id: String, kind: String },
    /// The intent carries no usable booking reference, or the booking is gone.
    Unmatched { event_id: String },
}

/// Turns processor activity into booking transitions.
///
/// The signed webhook is the authoritative channel. The client redirect is
/// only a hint: it makes the service re-read the intent from the processor
/// and acts on that, never on what the browser reports.
#[derive(Clone)]
pub struct PaymentReconciler {
    bookings: BookingManager,
    gateway: PaymentGatewayRef,
    verifier: WebhookVerifier,
    currency: String,
}

impl PaymentReconciler {
    pub fn new(
        bookings: BookingManager,
        gateway: PaymentGatewayRef,
        verifier: WebhookVerifier,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            bookings,
            gateway,
            verifier,
            currency: currency.into(),
        }
    }

    pub async fn create_payment_intent(
        &self,
        booking_id: BookingId,
        requester_id: UserId,
    ) -> Result<CheckoutTicket> {
        let booking = self.bookings.get_booking(booking_id, requester_id).await?;
        if booking.payment_status == PaymentStatus::Paid {
            return Err(MarketplaceError::ValidationError(format!(
                "Booking {booking_id} is already paid"
            )));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(MarketplaceError::ValidationError(format!(
                "Booking {booking_id} is cancelled"
            )));
        }

        let request = NewPaymentIntent::for_booking(&booking, &self.currency)?;
        let intent = self
            .gateway
            .create_intent(request)
            .await
            .inspect_err(|e| error!(booking_id, error = %e, "payment intent creation failed"))?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            MarketplaceError::PaymentProviderError(format!(
                "payment intent {} came back without a client secret",
                intent.id
            ))
        })?;

        info!(
            booking_id,
            payment_intent_id = %intent.id,
            amount = intent.amount,
            currency = %intent.currency,
            "payment intent created"
        );
        Ok(CheckoutTicket {
            client_secret,
            booking_id,
            payment_intent_id: intent.id,
        })
    }

    /// Verifies and applies one processor webhook delivery.
    ///
    /// Nothing is read or written before the signature checks out.
    pub async fn handle_webhook_event(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookReceipt> {
        if let Err(e) = self.verifier.verify(payload, signature, Utc::now()) {
            warn!(error = %e, "rejected webhook delivery");
            return Err(e);
        }

        let (event, payment_status) = match PaymentEvent::decode(payload)? {
            PaymentEvent::Succeeded(event) => (event, PaymentStatus::Paid),
            PaymentEvent::Failed(event) => (event, PaymentStatus::Failed),
            PaymentEvent::Ignored { event_id, kind } => {
                debug!(%event_id, %kind, "ignoring webhook event");
                return Ok(WebhookReceipt::Ignored { event_id, kind });
            }
        };

        let Some(booking_id) = event.intent.booking_id() else {
            warn!(
                event_id = %event.event_id,
                payment_intent_id = %event.intent.id,
                "payment event without a booking reference"
            );
            return Ok(WebhookReceipt::Unmatched {
                event_id: event.event_id,
            });
        };

        let requester = Requester::PaymentProcessor {
            observed_at: event.occurred_at,
            payment_intent_id: Some(event.intent.id.clone()),
        };
        match self
            .bookings
            .transition_status(
                booking_id,
                requester,
                payment_status.implied_status(),
                Some(payment_status),
            )
            .await
        {
            Ok(booking) => Ok(WebhookReceipt::Reconciled(booking)),
            Err(MarketplaceError::NotFoundError { .. }) => {
                warn!(booking_id, event_id = %event.event_id, "payment event for an unknown booking");
                Ok(WebhookReceipt::Unmatched {
                    event_id: event.event_id,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Handles the browser's return from the hosted payment page.
    pub async fn confirm_client_redirect(
        &self,
        booking_id: BookingId,
        requester_id: UserId,
        payment_intent_id: &str,
        client_reported: Option<PaymentStatus>,
    ) -> Result<Booking> {
        let booking = self.bookings.get_booking(booking_id, requester_id).await?;
        let intent = self.gateway.retrieve_intent(payment_intent_id).await?;
        if intent.booking_id() != Some(booking.id) {
            return Err(MarketplaceError::ValidationError(format!(
                "Payment intent {payment_intent_id} does not belong to booking {booking_id}"
            )));
        }

        let Some(outcome) = intent.status.outcome() else {
            debug!(booking_id, status = ?intent.status, "payment intent not settled yet");
            return Ok(booking);
        };
        if let Some(reported) = client_reported
            && reported != outcome
        {
            warn!(
                booking_id,
                %reported,
                processor = %outcome,
                "client-reported payment status disagrees with the processor"
            );
        }

        let requester = Requester::PaymentProcessor {
            observed_at: Utc::now(),
            payment_intent_id: Some(intent.id),
        };
        self.bookings
            .transition_status(booking_id, requester, outcome.implied_status(), Some(outcome))
            .await
    }
}
