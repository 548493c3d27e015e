#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{Duration, Utc};
use homefix::domain::catalog::default_services;
use homefix::domain::ports::Repositories;
use homefix::infrastructure::in_memory::InMemoryStore;
use homefix::infrastructure::sandbox::SandboxGateway;
use homefix::infrastructure::sessions::SessionStore;
use homefix::infrastructure::stripe::{SIGNATURE_HEADER, WebhookVerifier, signature_header};
use homefix::interfaces::http::{AppState, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_integration";

#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub gateway: SandboxGateway,
    pub repos: Repositories,
}

pub async fn spawn_app() -> TestApp {
    let repos = Repositories::from_store(InMemoryStore::default());
    let gateway = SandboxGateway::new();
    let state = AppState::new(
        repos.clone(),
        SessionStore::default(),
        Arc::new(gateway.clone()),
        WebhookVerifier::new(WEBHOOK_SECRET, Duration::seconds(300)),
        "inr",
    );
    state.catalog.seed(default_services()).await.unwrap();
    TestApp {
        router: router(state),
        gateway,
        repos,
    }
}

pub fn tomorrow() -> String {
    (Utc::now() + Duration::days(1)).to_rfc3339()
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        read_response(response).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, token, Some(body)).await
    }

    /// Registers an account and returns `(user id, bearer token)`.
    pub async fn register(&self, username: &str, is_provider: bool) -> (i64, String) {
        let (status, body) = self
            .post(
                "/api/register",
                None,
                json!({
                    "username": username,
                    "password": "password123",
                    "email": format!("{username}@example.com"),
                    "isProvider": is_provider,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Lists a fresh provider account for `service_id`, returning the provider id.
    pub async fn provider_for(&self, service_id: i64) -> i64 {
        let username = format!("pro{}", next_suffix());
        let (_, token) = self.register(&username, true).await;
        let (status, body) = self
            .post(
                "/api/providers",
                Some(&token),
                json!({ "serviceId": service_id, "experience": 6, "hourlyRate": 450 }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn book(&self, token: &str, provider_id: i64, service_id: i64) -> Value {
        let (status, body) = self
            .post(
                "/api/bookings",
                Some(token),
                json!({
                    "providerId": provider_id,
                    "serviceId": service_id,
                    "date": tomorrow(),
                    "address": "221B Baker Street",
                    "amount": 500,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    /// Requests a payment intent and returns its id.
    pub async fn checkout(&self, token: &str, booking_id: i64) -> String {
        let (status, body) = self
            .post(
                "/api/create-payment-intent",
                Some(token),
                json!({ "bookingId": booking_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["clientSecret"].as_str().is_some());
        body["paymentIntentId"].as_str().unwrap().to_string()
    }

    pub async fn post_webhook(&self, payload: Vec<u8>, signature: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        let request = builder.body(Body::from(payload)).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        read_response(response).await
    }

    /// Sends a correctly signed processor event for `intent_id`.
    pub async fn deliver(&self, kind: &str, intent_id: &str, created: i64) -> (StatusCode, Value) {
        let payload = self.gateway.event_payload(kind, intent_id, created).await.unwrap();
        let signature = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), &payload).unwrap();
        self.post_webhook(payload, Some(signature)).await
    }
}

async fn read_response(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn next_suffix() -> String {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static NEXT: AtomicUsize = AtomicUsize::new(1);
    NEXT.fetch_add(1, Ordering::SeqCst).to_string()
}
