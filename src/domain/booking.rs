use super::{BookingId, ProviderId, ServiceId, UserId};
use crate::error::{MarketplaceError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Represents a positive booking amount in major currency units.
///
/// Serialized as a JSON number. Conversion to the processor's minor units
/// rounds half away from zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(MarketplaceError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Amount in the smallest currency unit (paise, cents).
    pub fn minor_units(&self) -> Result<i64> {
        (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| {
                MarketplaceError::ValidationError("Amount is too large".to_string())
            })
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = MarketplaceError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = rust_decimal::serde::float::deserialize(deserializer)?;
        Amount::new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Allowed moves of the booking status. Repeating the current status is
    /// always allowed; `cancelled` is terminal and nothing moves back to
    /// `pending`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, _) | (Confirmed, Confirmed | Cancelled) | (Cancelled, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    /// `paid` is absorbing: once recorded, no later observation replaces it.
    pub fn accepts(self, next: Self) -> bool {
        self != PaymentStatus::Paid || next == PaymentStatus::Paid
    }

    /// Booking status that accompanies a processor-reported payment status.
    pub fn implied_status(self) -> BookingStatus {
        match self {
            PaymentStatus::Paid => BookingStatus::Confirmed,
            PaymentStatus::Pending | PaymentStatus::Failed => BookingStatus::Pending,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is asking for a status change.
#[derive(Debug, Clone, PartialEq)]
pub enum Requester {
    /// An authenticated customer; must own the booking.
    User(UserId),
    /// A verified observation from the payment processor. Skips the ownership
    /// check and carries the time the processor reported the outcome.
    PaymentProcessor {
        observed_at: DateTime<Utc>,
        payment_intent_id: Option<String>,
    },
}

/// A validated booking request, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: UserId,
    pub provider_id: ProviderId,
    pub service_id: ServiceId,
    pub date: DateTime<Utc>,
    pub address: String,
    pub amount: Amount,
}

impl NewBooking {
    pub fn new(
        user_id: UserId,
        provider_id: ProviderId,
        service_id: ServiceId,
        date: DateTime<Utc>,
        address: &str,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if date <= now {
            return Err(MarketplaceError::ValidationError(
                "Booking date must be in the future".to_string(),
            ));
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(MarketplaceError::ValidationError(
                "Address is required".to_string(),
            ));
        }
        Ok(Self {
            user_id,
            provider_id,
            service_id,
            date,
            address: address.to_string(),
            amount,
        })
    }
}

/// The status fields written by a single compare-and-swap update.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingPatch {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub payment_updated_at: Option<DateTime<Utc>>,
}

/// A scheduled engagement between a customer and a provider.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub provider_id: ProviderId,
    pub service_id: ServiceId,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub date: DateTime<Utc>,
    pub address: String,
    pub amount: Amount,
    pub payment_intent_id: Option<String>,
    pub payment_updated_at: Option<DateTime<Utc>>,
    /// Bumped on every status write; the compare-and-swap key.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn create(id: BookingId, new: NewBooking, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            provider_id: new.provider_id,
            service_id: new.service_id,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            date: new.date,
            address: new.address,
            amount: new.amount,
            payment_intent_id: None,
            payment_updated_at: None,
            version: 0,
            created_at,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn ensure_owned_by(&self, user_id: UserId) -> Result<()> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(MarketplaceError::ForbiddenError(format!(
                "booking {} belongs to another user",
                self.id
            )))
        }
    }

    pub fn apply(&mut self, patch: BookingPatch) {
        self.status = patch.status;
        self.payment_status = patch.payment_status;
        self.payment_intent_id = patch.payment_intent_id;
        self.payment_updated_at = patch.payment_updated_at;
        self.version += 1;
    }

    /// The incoming intent id when a processor reports a success for an intent
    /// other than the one this booking was already paid with.
    pub fn duplicate_capture<'a>(
        &self,
        requester: &'a Requester,
        payment_status: Option<PaymentStatus>,
    ) -> Option<&'a str> {
        let Requester::PaymentProcessor {
            payment_intent_id: Some(incoming),
            ..
        } = requester
        else {
            return None;
        };
        let recorded = self.payment_intent_id.as_deref()?;
        let second_success = self.payment_status == PaymentStatus::Paid
            && payment_status == Some(PaymentStatus::Paid);
        (second_success && recorded != incoming).then_some(incoming.as_str())
    }

    /// Works out the write that moves this booking to the requested state.
    ///
    /// `Ok(None)` means nothing needs writing: the request repeats the current
    /// state, or it is a non-success payment observation older than the one
    /// already recorded, or it would replace `paid`.
    pub fn plan_transition(
        &self,
        requester: &Requester,
        status: BookingStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Option<BookingPatch>> {
        match requester {
            Requester::User(user_id) => {
                self.ensure_owned_by(*user_id)?;
                if payment_status.is_some() {
                    return Err(MarketplaceError::ForbiddenError(
                        "payment status is reported by the payment processor".to_string(),
                    ));
                }
                // Confirmation only follows a successful payment.
                let user_confirm = status == BookingStatus::Confirmed && self.status != status;
                if user_confirm || !self.status.can_transition_to(status) {
                    return Err(MarketplaceError::InvalidTransition {
                        from: self.status.to_string(),
                        to: status.to_string(),
                    });
                }
                if status == self.status {
                    return Ok(None);
                }
                Ok(Some(BookingPatch {
                    status,
                    payment_status: self.payment_status,
                    payment_intent_id: self.payment_intent_id.clone(),
                    payment_updated_at: self.payment_updated_at,
                }))
            }
            Requester::PaymentProcessor {
                observed_at,
                payment_intent_id,
            } => {
                let Some(next_payment) = payment_status else {
                    return Err(MarketplaceError::ValidationError(
                        "payment observation without a payment status".to_string(),
                    ));
                };
                // A success is never stale: captured money is recorded whatever
                // order the observations arrive in.
                let stale = next_payment != PaymentStatus::Paid
                    && self
                        .payment_updated_at
                        .is_some_and(|last| *observed_at < last);
                if stale || !self.payment_status.accepts(next_payment) {
                    return Ok(None);
                }
                let next_status = if self.status.can_transition_to(status) {
                    status
                } else {
                    self.status
                };
                if next_status == self.status && next_payment == self.payment_status {
                    return Ok(None);
                }
                Ok(Some(BookingPatch {
                    status: next_status,
                    payment_status: next_payment,
                    payment_intent_id: payment_intent_id
                        .clone()
                        .or_else(|| self.payment_intent_id.clone()),
                    payment_updated_at: Some(*observed_at),
                }))
            }
        }
    }
}

/// Parses a client-supplied booking date.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC) and
/// plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_schedule(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MarketplaceError::ValidationError(format!("Invalid booking date: {raw}")))
}
