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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_USERS: &str = "users";
pub const CF_SERVICES: &str = "services";
pub const CF_PROVIDERS: &str = "providers";
pub const CF_BOOKINGS: &str = "bookings";
pub const CF_REVIEWS: &str = "reviews";
/// Column Family holding the next id of every other family.
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_USERS,
    CF_SERVICES,
    CF_PROVIDERS,
    CF_BOOKINGS,
    CF_REVIEWS,
    CF_META,
];

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own Column Family keyed by the big-endian id, with
/// JSON values. Reads go straight to RocksDB; every write (id allocation,
/// compare-and-swap, rating updates, uniqueness checks) runs under one
/// store-wide async mutex so read-modify-write sequences cannot interleave.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            MarketplaceError::StorageError(format!("{name} column family not found"))
        })
    }

    fn read<T: DeserializeOwned>(&self, family: &str, id: i64) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, family: &str, id: i64, value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, id.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, family: &str) -> Result<Vec<T>> {
        let cf = self.cf(family)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    /// Hands out the next id for `family`. Callers hold `write_lock`.
    fn allocate_id(&self, family: &str) -> Result<i64> {
        let meta = self.cf(CF_META)?;
        let next = match self.db.get_cf(meta, family.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    MarketplaceError::StorageError(format!("corrupt id counter for {family}"))
                })?;
                i64::from_be_bytes(raw)
            }
            None => 1,
        };
        self.db.put_cf(meta, family.as_bytes(), (next + 1).to_be_bytes())?;
        Ok(next)
    }
}

#[async_trait]
impl UserRepository for RocksDBStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.read(CF_USERS, id)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users: Vec<User> = self.scan(CF_USERS)?;
        Ok(users
            .into_iter()
            .find(|user| user.username.eq_ignore_ascii_case(username)))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let _guard = self.write_lock.lock().await;
        let users: Vec<User> = self.scan(CF_USERS)?;
        if users
            .iter()
            .any(|existing| existing.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(MarketplaceError::ConflictError(format!(
                "username {} is already taken",
                user.username
            )));
        }
        let user = User::create(self.allocate_id(CF_USERS)?, user, Utc::now());
        self.write(CF_USERS, user.id, &user)?;
        Ok(user)
    }
}

#[async_trait]
impl CatalogRepository for RocksDBStore {
    async fn get_service(&self, id: ServiceId) -> Result<Option<Service>> {
        self.read(CF_SERVICES, id)
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        self.scan(CF_SERVICES)
    }

    async fn list_services_by_category(&self, category: &str) -> Result<Vec<Service>> {
        let services: Vec<Service> = self.scan(CF_SERVICES)?;
        Ok(services
            .into_iter()
            .filter(|service| service.category == category)
            .collect())
    }

    async fn create_service(&self, service: NewService) -> Result<Service> {
        let _guard = self.write_lock.lock().await;
        let service = Service::create(self.allocate_id(CF_SERVICES)?, service, Utc::now());
        self.write(CF_SERVICES, service.id, &service)?;
        Ok(service)
    }

    async fn get_provider(&self, id: ProviderId) -> Result<Option<ServiceProvider>> {
        self.read(CF_PROVIDERS, id)
    }

    async fn list_providers(&self) -> Result<Vec<ServiceProvider>> {
        self.scan(CF_PROVIDERS)
    }

    async fn list_providers_by_service(&self, service_id: ServiceId) -> Result<Vec<ServiceProvider>> {
        let providers: Vec<ServiceProvider> = self.scan(CF_PROVIDERS)?;
        Ok(providers
            .into_iter()
            .filter(|provider| provider.service_id == service_id)
            .collect())
    }

    async fn create_provider(&self, provider: NewServiceProvider) -> Result<ServiceProvider> {
        let _guard = self.write_lock.lock().await;
        let provider =
            ServiceProvider::create(self.allocate_id(CF_PROVIDERS)?, provider, Utc::now());
        self.write(CF_PROVIDERS, provider.id, &provider)?;
        Ok(provider)
    }

    async fn record_provider_rating(
        &self,
        id: ProviderId,
        rating: Rating,
    ) -> Result<Option<ServiceProvider>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut provider) = self.read::<ServiceProvider>(CF_PROVIDERS, id)? else {
            return Ok(None);
        };
        provider.record_rating(rating);
        self.write(CF_PROVIDERS, id, &provider)?;
        Ok(Some(provider))
    }
}

#[async_trait]
impl BookingRepository for RocksDBStore {
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        self.read(CF_BOOKINGS, id)
    }

    async fn list_bookings_by_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let bookings: Vec<Booking> = self.scan(CF_BOOKINGS)?;
        Ok(bookings
            .into_iter()
            .filter(|booking| booking.user_id == user_id)
            .collect())
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking> {
        let _guard = self.write_lock.lock().await;
        let booking = Booking::create(self.allocate_id(CF_BOOKINGS)?, booking, Utc::now());
        self.write(CF_BOOKINGS, booking.id, &booking)?;
        Ok(booking)
    }

    async fn update_booking_status(
        &self,
        id: BookingId,
        expected_version: u64,
        patch: BookingPatch,
    ) -> Result<StatusWrite> {
        let _guard = self.write_lock.lock().await;
        let Some(mut booking) = self.read::<Booking>(CF_BOOKINGS, id)? else {
            return Ok(StatusWrite::Missing);
        };
        if booking.version != expected_version {
            return Ok(StatusWrite::Conflict(booking));
        }
        booking.apply(patch);
        self.write(CF_BOOKINGS, id, &booking)?;
        Ok(StatusWrite::Applied(booking))
    }
}

#[async_trait]
impl ReviewRepository for RocksDBStore {
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        self.read(CF_REVIEWS, id)
    }

    async fn get_review_by_booking(&self, booking_id: BookingId) -> Result<Option<Review>> {
        let reviews: Vec<Review> = self.scan(CF_REVIEWS)?;
        Ok(reviews
            .into_iter()
            .find(|review| review.booking_id == booking_id))
    }

    async fn list_reviews_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Review>> {
        let reviews: Vec<Review> = self.scan(CF_REVIEWS)?;
        Ok(reviews
            .into_iter()
            .filter(|review| review.provider_id == provider_id)
            .collect())
    }

    async fn create_review(&self, review: NewReview) -> Result<Review> {
        let _guard = self.write_lock.lock().await;
        let reviews: Vec<Review> = self.scan(CF_REVIEWS)?;
        if reviews
            .iter()
            .any(|existing| existing.booking_id == review.booking_id)
        {
            return Err(MarketplaceError::ConflictError(format!(
                "booking {} has already been reviewed",
                review.booking_id
            )));
        }
        let review = Review::create(self.allocate_id(CF_REVIEWS)?, review, Utc::now());
        self.write(CF_REVIEWS, review.id, &review)?;
        Ok(review)
    }
}
