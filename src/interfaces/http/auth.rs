use super::AppState;
use super::error::ApiError;
use super::extractors::{CurrentUser, JsonBody, bearer_token};
use crate::application::Registration;
use crate::domain::user::UserProfile;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<Registration>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let (user, token) = state.accounts.register(form).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (user, token) = state
        .accounts
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(SessionResponse { user, token }))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.accounts.logout(token).await;
    }
    StatusCode::NO_CONTENT
}

pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(user.profile())
}
