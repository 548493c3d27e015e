use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. `password_hash` is an argon2 PHC string and never
/// leaves the server; clients get a [`UserProfile`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub is_provider: bool,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub is_provider: bool,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub is_provider: bool,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn create(id: UserId, new: NewUser, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username: new.username,
            password_hash: new.password_hash,
            email: new.email,
            phone_number: new.phone_number,
            is_provider: new.is_provider,
            address: new.address,
            created_at,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            is_provider: self.is_provider,
            address: self.address.clone(),
            created_at: self.created_at,
        }
    }
}
