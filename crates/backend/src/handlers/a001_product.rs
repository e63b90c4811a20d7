use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::domain::a001_product::aggregate::{
    ProductCreateDto, ProductResponseDto, ProductUpdateDto,
};

use super::error::ApiError;
use crate::routes::AppState;

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(dto)| dto)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Нецелый сегмент пути тоже 400 с телом `{"error": ...}`
fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    path.map(|Path(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// GET /api/product
pub async fn list_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponseDto>>, ApiError> {
    let products = state.products.list_all().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /api/product/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ProductResponseDto>, ApiError> {
    let id = path_param(id)?;
    match state.products.get_by_id(id).await? {
        Some(product) => Ok(Json(product.into())),
        None => Err(ApiError::NotFound(format!("Product with ID {} not found", id))),
    }
}

/// POST /api/product
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<ProductCreateDto>, JsonRejection>,
) -> Result<Response, ApiError> {
    let dto = payload(body)?;
    dto.validate().map_err(ApiError::BadRequest)?;

    let created = state.products.create(dto.into_product()).await?;
    tracing::info!("Product {} created", created.id);

    let location = format!("/api/product/{}", created.id);
    let response = ProductResponseDto::from(created);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(response),
    )
        .into_response())
}

/// PUT /api/product/:id
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<ProductUpdateDto>, JsonRejection>,
) -> Result<Json<ProductResponseDto>, ApiError> {
    let id = path_param(id)?;
    let dto = payload(body)?;
    dto.validate().map_err(ApiError::BadRequest)?;

    let updated = state.products.update(id, dto.into_product(id)).await?;
    Ok(Json(updated.into()))
}

/// DELETE /api/product/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = path_param(id)?;
    state.products.delete(id).await?;
    tracing::info!("Product {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/product/:id/availability/:quantity
pub async fn check_availability(
    State(state): State<AppState>,
    params: Result<Path<(i32, i32)>, PathRejection>,
) -> Result<Json<bool>, ApiError> {
    let (id, quantity) = path_param(params)?;
    let available = state.products.check_availability(id, quantity).await?;
    Ok(Json(available))
}
