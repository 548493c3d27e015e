use super::booking::{Booking, BookingPatch, NewBooking};
use super::catalog::{NewService, NewServiceProvider, Service, ServiceProvider};
use super::payment::{NewPaymentIntent, PaymentIntent};
use super::review::{NewReview, Rating, Review};
use super::user::{NewUser, User};
use super::{BookingId, ProviderId, ReviewId, ServiceId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;
    /// Case-insensitive lookup.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Fails with `ConflictError` when the username is already taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_service(&self, id: ServiceId) -> Result<Option<Service>>;
    async fn list_services(&self) -> Result<Vec<Service>>;
    async fn list_services_by_category(&self, category: &str) -> Result<Vec<Service>>;
    async fn create_service(&self, service: NewService) -> Result<Service>;

    async fn get_provider(&self, id: ProviderId) -> Result<Option<ServiceProvider>>;
    async fn list_providers(&self) -> Result<Vec<ServiceProvider>>;
    async fn list_providers_by_service(&self, service_id: ServiceId) -> Result<Vec<ServiceProvider>>;
    async fn create_provider(&self, provider: NewServiceProvider) -> Result<ServiceProvider>;
    /// Folds one rating into the provider's aggregate as a single atomic
    /// read-modify-write. `None` if the provider does not exist.
    async fn record_provider_rating(
        &self,
        id: ProviderId,
        rating: Rating,
    ) -> Result<Option<ServiceProvider>>;
}

/// Outcome of a compare-and-swap status write.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusWrite {
    Applied(Booking),
    /// The stored version moved on; carries the current booking.
    Conflict(Booking),
    Missing,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;
    async fn list_bookings_by_user(&self, user_id: UserId) -> Result<Vec<Booking>>;
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking>;
    /// Writes `patch` only if the stored booking is still at
    /// `expected_version`.
    async fn update_booking_status(
        &self,
        id: BookingId,
        expected_version: u64,
        patch: BookingPatch,
    ) -> Result<StatusWrite>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>>;
    async fn get_review_by_booking(&self, booking_id: BookingId) -> Result<Option<Review>>;
    async fn list_reviews_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Review>>;
    /// Fails with `ConflictError` when the booking already has a review.
    async fn create_review(&self, review: NewReview) -> Result<Review>;
}

/// The external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent>;
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;
}

pub type UserRepositoryRef = Arc<dyn UserRepository>;
pub type CatalogRepositoryRef = Arc<dyn CatalogRepository>;
pub type BookingRepositoryRef = Arc<dyn BookingRepository>;
pub type ReviewRepositoryRef = Arc<dyn ReviewRepository>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;

/// The full set of repositories one storage backend provides.
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepositoryRef,
    pub catalog: CatalogRepositoryRef,
    pub bookings: BookingRepositoryRef,
    pub reviews: ReviewRepositoryRef,
}

impl Repositories {
    /// Shares one store that implements every repository trait.
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository + CatalogRepository + BookingRepository + ReviewRepository + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            catalog: store.clone(),
            bookings: store.clone(),
            reviews: store,
        }
    }
}
