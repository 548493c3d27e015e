//! HTTP surface: an axum router over the application services.
//!
//! Handlers only translate between JSON and the application layer; ownership
//! checks and state rules live below them.

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod error;
pub mod extractors;
pub mod payments;
pub mod reviews;

use crate::application::{AccountService, BookingManager, CatalogService, PaymentReconciler};
use crate::domain::ports::{PaymentGatewayRef, Repositories};
use crate::infrastructure::sessions::SessionStore;
use crate::infrastructure::stripe::WebhookVerifier;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, patch, post};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// Everything a handler can reach. Cheap to clone: all fields are handles.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub bookings: BookingManager,
    pub payments: PaymentReconciler,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        sessions: SessionStore,
        gateway: PaymentGatewayRef,
        verifier: WebhookVerifier,
        currency: &str,
    ) -> Self {
        let bookings = BookingManager::new(
            repos.bookings.clone(),
            repos.catalog.clone(),
            repos.reviews.clone(),
        );
        Self {
            accounts: AccountService::new(repos.users.clone(), sessions),
            catalog: CatalogService::new(repos.catalog.clone()),
            payments: PaymentReconciler::new(bookings.clone(), gateway, verifier, currency),
            bookings,
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeSessions": state.accounts.active_sessions().await,
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/user", get(auth::current_user))
        .route("/api/services", get(catalog::list_services))
        .route("/api/services/:id", get(catalog::get_service))
        .route(
            "/api/services/category/:category",
            get(catalog::services_in_category),
        )
        .route(
            "/api/providers",
            get(catalog::list_providers).post(catalog::create_provider),
        )
        .route("/api/providers/:id", get(catalog::get_provider))
        .route(
            "/api/providers/service/:service_id",
            get(catalog::providers_for_service),
        )
        .route("/api/bookings", get(bookings::list).post(bookings::create))
        .route("/api/bookings/:id", get(bookings::get))
        .route("/api/bookings/:id/status", patch(bookings::update_status))
        .route("/api/bookings/:id/payment", patch(bookings::confirm_payment))
        .route("/api/reviews", post(reviews::create))
        .route(
            "/api/reviews/provider/:provider_id",
            get(reviews::list_for_provider),
        )
        .route(
            "/api/create-payment-intent",
            post(payments::create_payment_intent),
        )
        .route("/api/webhook", post(payments::webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
