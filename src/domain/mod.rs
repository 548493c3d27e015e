//! Domain layer: entities, status rules and the ports the adapters implement.

pub mod booking;
pub mod catalog;
pub mod payment;
pub mod ports;
pub mod review;
pub mod user;

pub type UserId = i64;
pub type ServiceId = i64;
pub type ProviderId = i64;
pub type BookingId = i64;
pub type ReviewId = i64;
