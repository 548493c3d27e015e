use super::review::Rating;
use super::{ProviderId, ServiceId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog entry customers can book.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A catalog row as read from the seed file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub image: Option<String>,
}

impl NewService {
    fn builtin(name: &str, description: &str, category: &str, price: i64, image: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            price: Decimal::from(price),
            image: Some(image.to_string()),
        }
    }
}

impl Service {
    pub fn create(id: ServiceId, new: NewService, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            category: new.category,
            price: new.price,
            image: new.image,
            created_at,
        }
    }
}

/// Catalog used when no seed file is configured.
pub fn default_services() -> Vec<NewService> {
    vec![
        NewService::builtin(
            "Plumbing",
            "Professional plumbing services for all your home needs",
            "plumbing",
            299,
            "fas fa-wrench",
        ),
        NewService::builtin(
            "Electrical",
            "Expert electrical repair and installation services",
            "electrical",
            349,
            "fas fa-bolt",
        ),
        NewService::builtin(
            "Cleaning",
            "Professional home cleaning services",
            "cleaning",
            499,
            "fas fa-broom",
        ),
        NewService::builtin(
            "Painting",
            "Interior and exterior painting services",
            "painting",
            1999,
            "fas fa-paint-roller",
        ),
        NewService::builtin(
            "Bathroom",
            "Bathroom repair and renovation services",
            "bathroom",
            699,
            "fas fa-shower",
        ),
        NewService::builtin(
            "Appliance",
            "Appliance repair and maintenance services",
            "appliance",
            399,
            "fas fa-tools",
        ),
    ]
}

/// A user's offering of one catalog service.
///
/// `rating` is the running integer average of all review ratings and only
/// changes through [`ServiceProvider::record_rating`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProvider {
    pub id: ProviderId,
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub description: Option<String>,
    pub experience: Option<i32>,
    pub hourly_rate: Option<i64>,
    pub availability: Option<String>,
    pub rating: i32,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewServiceProvider {
    #[serde(default)]
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub description: Option<String>,
    pub experience: Option<i32>,
    pub hourly_rate: Option<i64>,
    pub availability: Option<String>,
}

impl ServiceProvider {
    pub fn create(id: ProviderId, new: NewServiceProvider, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            service_id: new.service_id,
            description: new.description,
            experience: new.experience,
            hourly_rate: new.hourly_rate,
            availability: new.availability,
            rating: 0,
            review_count: 0,
            created_at,
        }
    }

    /// Folds one more review into the running average.
    pub fn record_rating(&mut self, rating: Rating) {
        let (rating, count) = recompute_rating(self.rating, self.review_count, rating);
        self.rating = rating;
        self.review_count = count;
    }
}

/// `round((rating * count + r) / (count + 1))`, rounding halves up, kept in
/// integers so no fractional rating is ever stored.
pub fn recompute_rating(rating: i32, count: i32, new_rating: Rating) -> (i32, i32) {
    let new_count = count + 1;
    let sum = i64::from(rating) * i64::from(count) + i64::from(new_rating.value());
    let rounded = (2 * sum + i64::from(new_count)) / (2 * i64::from(new_count));
    (rounded as i32, new_count)
}
