use super::AppState;
use super::error::ApiError;
use super::extractors::{CurrentUser, JsonBody, PathId};
use crate::domain::review::Review;
use crate::domain::{BookingId, ProviderId};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub provider_id: ProviderId,
    pub booking_id: BookingId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let review = state
        .bookings
        .create_review(
            user.id,
            request.booking_id,
            request.provider_id,
            request.rating,
            request.comment,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_for_provider(
    State(state): State<AppState>,
    PathId(provider_id): PathId,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.bookings.provider_reviews(provider_id).await?))
}
