use super::AppState;
use super::error::ApiError;
use super::extractors::{CurrentUser, JsonBody, PathId};
use crate::domain::booking::{Amount, Booking, BookingStatus, PaymentStatus, Requester, parse_schedule};
use crate::domain::{ProviderId, ServiceId};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub provider_id: ProviderId,
    pub service_id: ServiceId,
    /// ISO-8601 date or timestamp.
    pub date: String,
    pub address: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: BookingStatus,
}

/// Body sent when the browser returns from the hosted payment page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
    pub payment_intent_id: String,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let date = parse_schedule(&request.date)?;
    let amount = Amount::new(request.amount)?;
    let booking = state
        .bookings
        .create_booking(
            user.id,
            request.provider_id,
            request.service_id,
            date,
            &request.address,
            amount,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(state.bookings.list_bookings(user.id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.bookings.get_booking(id, user.id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .bookings
        .transition_status(id, Requester::User(user.id), update.status, None)
        .await?;
    Ok(Json(booking))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
    JsonBody(update): JsonBody<PaymentUpdate>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .payments
        .confirm_client_redirect(
            id,
            user.id,
            &update.payment_intent_id,
            Some(update.payment_status),
        )
        .await?;
    Ok(Json(booking))
}
