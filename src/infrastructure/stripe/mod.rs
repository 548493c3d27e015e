//! Stripe-compatible payment processor adapter: REST calls for payment
//! intents and signature checks for inbound webhooks.

pub mod rest;
pub mod webhook;

pub use rest::StripeGateway;
pub use webhook::{SIGNATURE_HEADER, WebhookVerifier, signature_header};
