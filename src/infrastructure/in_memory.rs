use crate::domain::booking::{Booking, BookingPatch, NewBooking};
use crate::domain::catalog::{NewService, NewServiceProvider, Service, ServiceProvider};
use crate::domain::ports::{
    BookingRepository, CatalogRepository, ReviewRepository, StatusWrite, UserRepository,
};
use crate::domain::review::{NewReview, Rating, Review};
use crate::domain::user::{NewUser, User};
use crate::domain::{BookingId, ProviderId, ReviewId, ServiceId, UserId};
use crate::error::{MarketplaceError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One entity map plus its id generator. Ids start at 1 and never repeat.
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn filtered(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|row| predicate(row)).cloned().collect()
    }
}

/// A thread-safe in-memory store for every marketplace entity.
///
/// Each table sits behind its own `Arc<RwLock<_>>`, so a write is atomic for
/// one entity and never blocks readers of other tables. Cloning shares the
/// underlying tables. Ideal for tests and single-process deployments.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    users: Arc<RwLock<Table<User>>>,
    services: Arc<RwLock<Table<Service>>>,
    providers: Arc<RwLock<Table<ServiceProvider>>>,
    bookings: Arc<RwLock<Table<Booking>>>,
    reviews: Arc<RwLock<Table<Review>>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .rows
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if users
            .rows
            .values()
            .any(|existing| existing.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(MarketplaceError::ConflictError(format!(
                "username {} is already taken",
                user.username
            )));
        }
        let id = users.allocate_id();
        let user = User::create(id, user, Utc::now());
        users.rows.insert(id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn get_service(&self, id: ServiceId) -> Result<Option<Service>> {
        Ok(self.services.read().await.get(id))
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        Ok(self.services.read().await.filtered(|_| true))
    }

    async fn list_services_by_category(&self, category: &str) -> Result<Vec<Service>> {
        Ok(self
            .services
            .read()
            .await
            .filtered(|service| service.category == category))
    }

    async fn create_service(&self, service: NewService) -> Result<Service> {
        let mut services = self.services.write().await;
        let id = services.allocate_id();
        let service = Service::create(id, service, Utc::now());
        services.rows.insert(id, service.clone());
        Ok(service)
    }

    async fn get_provider(&self, id: ProviderId) -> Result<Option<ServiceProvider>> {
        Ok(self.providers.read().await.get(id))
    }

    async fn list_providers(&self) -> Result<Vec<ServiceProvider>> {
        Ok(self.providers.read().await.filtered(|_| true))
    }

    async fn list_providers_by_service(&self, service_id: ServiceId) -> Result<Vec<ServiceProvider>> {
        Ok(self
            .providers
            .read()
            .await
            .filtered(|provider| provider.service_id == service_id))
    }

    async fn create_provider(&self, provider: NewServiceProvider) -> Result<ServiceProvider> {
        let mut providers = self.providers.write().await;
        let id = providers.allocate_id();
        let provider = ServiceProvider::create(id, provider, Utc::now());
        providers.rows.insert(id, provider.clone());
        Ok(provider)
    }

    async fn record_provider_rating(
        &self,
        id: ProviderId,
        rating: Rating,
    ) -> Result<Option<ServiceProvider>> {
        // Held across the read and the write so concurrent reviews serialize.
        let mut providers = self.providers.write().await;
        Ok(providers.rows.get_mut(&id).map(|provider| {
            provider.record_rating(rating);
            provider.clone()
        }))
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(id))
    }

    async fn list_bookings_by_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .filtered(|booking| booking.user_id == user_id))
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking> {
        let mut bookings = self.bookings.write().await;
        let id = bookings.allocate_id();
        let booking = Booking::create(id, booking, Utc::now());
        bookings.rows.insert(id, booking.clone());
        Ok(booking)
    }

    async fn update_booking_status(
        &self,
        id: BookingId,
        expected_version: u64,
        patch: BookingPatch,
    ) -> Result<StatusWrite> {
        let mut bookings = self.bookings.write().await;
        Ok(match bookings.rows.get_mut(&id) {
            None => StatusWrite::Missing,
            Some(booking) if booking.version != expected_version => {
                StatusWrite::Conflict(booking.clone())
            }
            Some(booking) => {
                booking.apply(patch);
                StatusWrite::Applied(booking.clone())
            }
        })
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        Ok(self.reviews.read().await.get(id))
    }

    async fn get_review_by_booking(&self, booking_id: BookingId) -> Result<Option<Review>> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .rows
            .values()
            .find(|review| review.booking_id == booking_id)
            .cloned())
    }

    async fn list_reviews_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .read()
            .await
            .filtered(|review| review.provider_id == provider_id))
    }

    async fn create_review(&self, review: NewReview) -> Result<Review> {
        let mut reviews = self.reviews.write().await;
        if reviews
            .rows
            .values()
            .any(|existing| existing.booking_id == review.booking_id)
        {
            return Err(MarketplaceError::ConflictError(format!(
                "booking {} has already been reviewed",
                review.booking_id
            )));
        }
        let id = reviews.allocate_id();
        let review = Review::create(id, review, Utc::now());
        reviews.rows.insert(id, review.clone());
        Ok(review)
    }
}
