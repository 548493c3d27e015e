use super::AppState;
use super::error::ApiError;
use super::extractors::{CurrentUser, JsonBody, PathId};
use crate::domain::catalog::{NewServiceProvider, Service, ServiceProvider};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.catalog.list_services().await?))
}

pub async fn get_service(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.catalog.get_service(id).await?))
}

pub async fn services_in_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.catalog.services_in_category(&category).await?))
}

pub async fn list_providers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceProvider>>, ApiError> {
    Ok(Json(state.catalog.list_providers().await?))
}

pub async fn get_provider(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<Json<ServiceProvider>, ApiError> {
    Ok(Json(state.catalog.get_provider(id).await?))
}

pub async fn providers_for_service(
    State(state): State<AppState>,
    PathId(service_id): PathId,
) -> Result<Json<Vec<ServiceProvider>>, ApiError> {
    Ok(Json(state.catalog.providers_for_service(service_id).await?))
}

pub async fn create_provider(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(listing): JsonBody<NewServiceProvider>,
) -> Result<(StatusCode, Json<ServiceProvider>), ApiError> {
    let provider = state.catalog.register_provider(&user, listing).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}
