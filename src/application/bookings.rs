use crate::domain::booking::{Amount, Booking, BookingStatus, NewBooking, PaymentStatus, Requester};
use crate::domain::ports::{
    BookingRepositoryRef, CatalogRepositoryRef, ReviewRepositoryRef, StatusWrite,
};
use crate::domain::review::{NewReview, Rating, Review};
use crate::domain::{BookingId, ProviderId, ServiceId, UserId};
use crate::error::{MarketplaceError, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// How many times a status write is re-planned against fresh state before
/// giving up.
const MAX_WRITE_ATTEMPTS: usize = 8;

/// Owns the booking lifecycle: creation, ownership-checked reads, status
/// transitions and reviews.
///
/// Every status write is a compare-and-swap on the booking's `version`, so a
/// webhook confirmation racing a client redirect (or a cancellation) never
/// overwrites state it has not seen.
#[derive(Clone)]
pub struct BookingManager {
    bookings: BookingRepositoryRef,
    catalog: CatalogRepositoryRef,
    reviews: ReviewRepositoryRef,
}

impl BookingManager {
    pub fn new(
        bookings: BookingRepositoryRef,
        catalog: CatalogRepositoryRef,
        reviews: ReviewRepositoryRef,
    ) -> Self {
        Self {
            bookings,
            catalog,
            reviews,
        }
    }

    /// Creates a booking in `pending/pending`.
    pub async fn create_booking(
        &self,
        user_id: UserId,
        provider_id: ProviderId,
        service_id: ServiceId,
        date: DateTime<Utc>,
        address: &str,
        amount: Amount,
    ) -> Result<Booking> {
        let new = NewBooking::new(
            user_id,
            provider_id,
            service_id,
            date,
            address,
            amount,
            Utc::now(),
        )?;

        let service = self
            .catalog
            .get_service(service_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Service", service_id))?;
        let provider = self
            .catalog
            .get_provider(provider_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Provider", provider_id))?;
        if provider.service_id != service.id {
            return Err(MarketplaceError::ValidationError(format!(
                "Provider {provider_id} does not offer service {service_id}"
            )));
        }

        let booking = self.bookings.create_booking(new).await?;
        info!(
            booking_id = booking.id,
            user_id,
            provider_id,
            service_id,
            "booking created"
        );
        Ok(booking)
    }

    async fn load(&self, booking_id: BookingId) -> Result<Booking> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Booking", booking_id))
    }

    pub async fn get_booking(&self, booking_id: BookingId, requester_id: UserId) -> Result<Booking> {
        let booking = self.load(booking_id).await?;
        booking.ensure_owned_by(requester_id)?;
        Ok(booking)
    }

    pub async fn list_bookings(&self, requester_id: UserId) -> Result<Vec<Booking>> {
        self.bookings.list_bookings_by_user(requester_id).await
    }

    /// Moves a booking to `status` (and, for processor observations, to
    /// `payment_status`).
    ///
    /// Requests that change nothing return the booking as stored. A write that
    /// loses a race is re-planned against the winner's state; after
    /// `MAX_WRITE_ATTEMPTS` losses the call fails with `ConflictError`.
    pub async fn transition_status(
        &self,
        booking_id: BookingId,
        requester: Requester,
        status: BookingStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Booking> {
        let mut current = self.load(booking_id).await?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(patch) = current.plan_transition(&requester, status, payment_status)? else {
                if let Some(incoming) = current.duplicate_capture(&requester, payment_status) {
                    warn!(
                        booking_id,
                        recorded_intent = current.payment_intent_id.as_deref().unwrap_or_default(),
                        incoming_intent = incoming,
                        "second successful payment for an already paid booking"
                    );
                    return Ok(current);
                }
                debug!(
                    booking_id,
                    status = %current.status,
                    payment_status = %current.payment_status,
                    requested_status = %status,
                    "status write skipped"
                );
                return Ok(current);
            };

            match self
                .bookings
                .update_booking_status(booking_id, current.version, patch)
                .await?
            {
                StatusWrite::Applied(updated) => {
                    info!(
                        booking_id,
                        status = %updated.status,
                        payment_status = %updated.payment_status,
                        version = updated.version,
                        "booking status updated"
                    );
                    return Ok(updated);
                }
                StatusWrite::Conflict(latest) => {
                    debug!(
                        booking_id,
                        attempt,
                        expected_version = current.version,
                        found_version = latest.version,
                        "concurrent status write, re-planning"
                    );
                    current = latest;
                }
                StatusWrite::Missing => {
                    return Err(MarketplaceError::not_found("Booking", booking_id));
                }
            }
        }

        warn!(booking_id, "gave up on status write after repeated conflicts");
        Err(MarketplaceError::ConflictError(format!(
            "booking {booking_id} is being updated concurrently, retry later"
        )))
    }

    /// Stores a review for a booking the user owns, then folds the rating
    /// into the provider's aggregate.
    pub async fn create_review(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        provider_id: ProviderId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Review> {
        let booking = self.get_booking(booking_id, user_id).await?;
        if booking.provider_id != provider_id {
            return Err(MarketplaceError::ValidationError(format!(
                "Booking {booking_id} was not with provider {provider_id}"
            )));
        }
        let rating = Rating::new(rating)?;
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let review = self
            .reviews
            .create_review(NewReview {
                user_id,
                provider_id,
                booking_id,
                rating,
                comment,
            })
            .await?;

        match self.catalog.record_provider_rating(provider_id, rating).await? {
            Some(provider) => debug!(
                provider_id,
                rating = provider.rating,
                review_count = provider.review_count,
                "provider rating recomputed"
            ),
            None => warn!(provider_id, review_id = review.id, "review stored for a missing provider"),
        }
        Ok(review)
    }

    pub async fn provider_reviews(&self, provider_id: ProviderId) -> Result<Vec<Review>> {
        self.reviews.list_reviews_by_provider(provider_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{NewService, NewServiceProvider};
    use crate::domain::ports::Repositories;
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    struct Fixture {
        manager: BookingManager,
        repos: Repositories,
        provider_id: ProviderId,
        service_id: ServiceId,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::from_store(InMemoryStore::default());
        let service = repos
            .catalog
            .create_service(NewService {
                name: "Plumbing".to_string(),
                description: "Pipes".to_string(),
                category: "Plumbing".to_string(),
                price: dec!(299),
                image: None,
            })
            .await
            .unwrap();
        let provider = repos
            .catalog
            .create_provider(NewServiceProvider {
                user_id: 100,
                service_id: service.id,
                description: None,
                experience: Some(5),
                hourly_rate: Some(400),
                availability: None,
            })
            .await
            .unwrap();
        let manager = BookingManager::new(
            repos.bookings.clone(),
            repos.catalog.clone(),
            repos.reviews.clone(),
        );
        Fixture {
            manager,
            repos,
            provider_id: provider.id,
            service_id: service.id,
        }
    }

    impl Fixture {
        async fn book(&self, user_id: UserId) -> Booking {
            self.manager
                .create_booking(
                    user_id,
                    self.provider_id,
                    self.service_id,
                    Utc::now() + Duration::days(1),
                    "12 Main Street",
                    Amount::new(dec!(500)).unwrap(),
                )
                .await
                .unwrap()
        }
    }

    fn processor(observed_at: DateTime<Utc>) -> Requester {
        Requester::PaymentProcessor {
            observed_at,
            payment_intent_id: Some("pi_1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_new_booking_starts_pending() {
        let fx = fixture().await;
        let booking = fx.book(1).await;
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_booking_rejections() {
        let fx = fixture().await;
        let amount = Amount::new(dec!(500)).unwrap();

        let past = fx
            .manager
            .create_booking(1, fx.provider_id, fx.service_id, Utc::now() - Duration::hours(1), "a", amount)
            .await;
        assert!(matches!(past, Err(MarketplaceError::ValidationError(_))));

        let tomorrow = Utc::now() + Duration::days(1);
        let missing_provider = fx
            .manager
            .create_booking(1, 99, fx.service_id, tomorrow, "a", amount)
            .await;
        assert!(matches!(
            missing_provider,
            Err(MarketplaceError::NotFoundError { entity: "Provider", .. })
        ));

        let missing_service = fx
            .manager
            .create_booking(1, fx.provider_id, 99, tomorrow, "a", amount)
            .await;
        assert!(matches!(
            missing_service,
            Err(MarketplaceError::NotFoundError { entity: "Service", .. })
        ));
    }

    #[tokio::test]
    async fn test_provider_must_offer_service() {
        let fx = fixture().await;
        let other = fx
            .repos
            .catalog
            .create_service(NewService {
                name: "Cleaning".to_string(),
                description: "Deep clean".to_string(),
                category: "Cleaning".to_string(),
                price: dec!(499),
                image: None,
            })
            .await
            .unwrap();
        let result = fx
            .manager
            .create_booking(
                1,
                fx.provider_id,
                other.id,
                Utc::now() + Duration::days(1),
                "a",
                Amount::new(dec!(1)).unwrap(),
            )
            .await;
        assert!(matches!(result, Err(MarketplaceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_reads_are_ownership_checked() {
        let fx = fixture().await;
        let booking = fx.book(1).await;

        assert!(fx.manager.get_booking(booking.id, 1).await.is_ok());
        assert!(matches!(
            fx.manager.get_booking(booking.id, 2).await,
            Err(MarketplaceError::ForbiddenError(_))
        ));
        assert!(fx.manager.list_bookings(2).await.unwrap().is_empty());
        assert_eq!(fx.manager.list_bookings(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_cancellation_and_rejections() {
        let fx = fixture().await;
        let booking = fx.book(1).await;

        let stranger = fx
            .manager
            .transition_status(booking.id, Requester::User(2), BookingStatus::Cancelled, None)
            .await;
        assert!(matches!(stranger, Err(MarketplaceError::ForbiddenError(_))));

        let self_confirm = fx
            .manager
            .transition_status(booking.id, Requester::User(1), BookingStatus::Confirmed, None)
            .await;
        assert!(matches!(self_confirm, Err(MarketplaceError::InvalidTransition { .. })));

        let cancelled = fx
            .manager
            .transition_status(booking.id, Requester::User(1), BookingStatus::Cancelled, None)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let reopen = fx
            .manager
            .transition_status(booking.id, Requester::User(1), BookingStatus::Pending, None)
            .await;
        assert!(matches!(reopen, Err(MarketplaceError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_confirmed_cannot_go_back_to_pending() {
        let fx = fixture().await;
        let booking = fx.book(1).await;
        fx.manager
            .transition_status(
                booking.id,
                processor(Utc::now()),
                BookingStatus::Confirmed,
                Some(PaymentStatus::Paid),
            )
            .await
            .unwrap();

        let result = fx
            .manager
            .transition_status(booking.id, Requester::User(1), BookingStatus::Pending, None)
            .await;
        assert!(matches!(result, Err(MarketplaceError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_success_applied_twice_is_a_noop() {
        let fx = fixture().await;
        let booking = fx.book(1).await;
        let at = Utc::now();

        let first = fx
            .manager
            .transition_status(booking.id, processor(at), BookingStatus::Confirmed, Some(PaymentStatus::Paid))
            .await
            .unwrap();
        let second = fx
            .manager
            .transition_status(booking.id, processor(at), BookingStatus::Confirmed, Some(PaymentStatus::Paid))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.version, 1);
        assert_eq!(second.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn test_second_capture_keeps_first_intent() {
        let fx = fixture().await;
        let booking = fx.book(1).await;
        let at = Utc::now();

        let paid = fx
            .manager
            .transition_status(booking.id, processor(at), BookingStatus::Confirmed, Some(PaymentStatus::Paid))
            .await
            .unwrap();
        let other_intent = Requester::PaymentProcessor {
            observed_at: at + Duration::seconds(5),
            payment_intent_id: Some("pi_2".to_string()),
        };
        assert_eq!(
            paid.duplicate_capture(&other_intent, Some(PaymentStatus::Paid)),
            Some("pi_2")
        );
        let after = fx
            .manager
            .transition_status(booking.id, other_intent, BookingStatus::Confirmed, Some(PaymentStatus::Paid))
            .await
            .unwrap();
        assert_eq!(after, paid);
        assert_eq!(after.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn test_late_failure_does_not_clobber_paid() {
        let fx = fixture().await;
        let booking = fx.book(1).await;
        let t0 = Utc::now();

        fx.manager
            .transition_status(booking.id, processor(t0), BookingStatus::Confirmed, Some(PaymentStatus::Paid))
            .await
            .unwrap();
        let after = fx
            .manager
            .transition_status(
                booking.id,
                processor(t0 + Duration::seconds(30)),
                BookingStatus::Pending,
                Some(PaymentStatus::Failed),
            )
            .await
            .unwrap();
        assert_eq!(after.status, BookingStatus::Confirmed);
        assert_eq!(after.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_racing_processor_writes_converge() {
        let fx = fixture().await;
        let booking = fx.book(1).await;
        let t0 = Utc::now();

        let mut handles = Vec::new();
        for i in 0..16 {
            let manager = fx.manager.clone();
            let (status, payment) = if i % 2 == 0 {
                (BookingStatus::Confirmed, PaymentStatus::Paid)
            } else {
                (BookingStatus::Pending, PaymentStatus::Failed)
            };
            handles.push(tokio::spawn(async move {
                manager
                    .transition_status(booking.id, processor(t0), status, Some(payment))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = fx.repos.bookings.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_review_recomputes_provider_rating() {
        let fx = fixture().await;
        let first = fx.book(1).await;
        let second = fx.book(1).await;

        fx.manager
            .create_review(1, first.id, fx.provider_id, 4, Some("Good".to_string()))
            .await
            .unwrap();
        let review = fx
            .manager
            .create_review(1, second.id, fx.provider_id, 5, Some("  ".to_string()))
            .await
            .unwrap();
        assert_eq!(review.comment, None);

        let provider = fx.repos.catalog.get_provider(fx.provider_id).await.unwrap().unwrap();
        assert_eq!(provider.review_count, 2);
        // round(9 / 2) = 5 with halves rounded up
        assert_eq!(provider.rating, 5);
        assert_eq!(fx.manager.provider_reviews(fx.provider_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_review_rejections() {
        let fx = fixture().await;
        let booking = fx.book(1).await;

        let foreign = fx.manager.create_review(2, booking.id, fx.provider_id, 5, None).await;
        assert!(matches!(foreign, Err(MarketplaceError::ForbiddenError(_))));

        let wrong_provider = fx.manager.create_review(1, booking.id, 77, 5, None).await;
        assert!(matches!(wrong_provider, Err(MarketplaceError::ValidationError(_))));

        let out_of_range = fx.manager.create_review(1, booking.id, fx.provider_id, 6, None).await;
        assert!(matches!(out_of_range, Err(MarketplaceError::ValidationError(_))));

        let missing = fx.manager.create_review(1, 404, fx.provider_id, 5, None).await;
        assert!(matches!(missing, Err(MarketplaceError::NotFoundError { .. })));

        fx.manager
            .create_review(1, booking.id, fx.provider_id, 5, None)
            .await
            .unwrap();
        let duplicate = fx.manager.create_review(1, booking.id, fx.provider_id, 3, None).await;
        assert!(matches!(duplicate, Err(MarketplaceError::ConflictError(_))));

        let provider = fx.repos.catalog.get_provider(fx.provider_id).await.unwrap().unwrap();
        assert_eq!(provider.review_count, 1);
    }
}
