//! Application layer: the use cases the HTTP surface calls into.
//!
//! Managers hold repository and gateway handles as shared trait objects and
//! never lock anything across a call to the payment processor.

pub mod accounts;
pub mod bookings;
pub mod catalog;
pub mod payments;

pub use accounts::{AccountService, Registration};
pub use bookings::BookingManager;
pub use catalog::CatalogService;
pub use payments::{CheckoutTicket, PaymentReconciler, WebhookReceipt};
