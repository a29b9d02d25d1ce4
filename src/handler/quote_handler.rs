use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bson::oid::ObjectId;
use tracing::info;
use validator::Validate;

use crate::dto::quote_dto::{
    ApproveTierChangeRequest, CreateQuoteRequest, ListQuotesQuery, QuoteResponseDto,
    UpdateQuoteRequest, UpdateSettingsRequest,
};
use crate::service::quote_service::QuoteService;
use crate::util::error::{HandlerError, HandlerErrorKind};

pub fn parse_object_id(id: &str) -> Result<ObjectId, HandlerError> {
    ObjectId::parse_str(id)
        .map_err(|_| HandlerError::bad_request(format!("invalid quote id: {}", id)))
}

fn validation_error(e: validator::ValidationErrors) -> HandlerError {
    HandlerError::new(HandlerErrorKind::Validation, e.to_string())
}

pub async fn create_quote_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[create_quote_handler] Handler called");
    payload.validate().map_err(validation_error)?;
    let quote = service.create_quote(payload).await.map_err(HandlerError::from)?;
    Ok((StatusCode::CREATED, Json(QuoteResponseDto::from(quote))))
}

pub async fn get_quote_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id)?;
    let quote = service.get_quote(id).await.map_err(HandlerError::from)?;
    Ok(Json(quote))
}

pub async fn update_quote_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[update_quote_handler] Handler called");
    let id = parse_object_id(&id)?;
    payload.validate().map_err(validation_error)?;
    let quote = service.update_quote(id, payload).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn deactivate_quote_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[deactivate_quote_handler] Handler called");
    let id = parse_object_id(&id)?;
    service.deactivate_quote(id).await.map_err(HandlerError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_quotes_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Query(query): Query<ListQuotesQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let quotes = service
        .list_quotes(&query.tenant_id, query.page, query.limit)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(quotes))
}

pub async fn send_quote_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[send_quote_handler] Handler called");
    let id = parse_object_id(&id)?;
    let quote = service.send_quote(id).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn get_settings_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let settings = service.get_settings(&tenant_id).await.map_err(HandlerError::from)?;
    Ok(Json(settings))
}

pub async fn update_settings_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(tenant_id): Path<String>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[update_settings_handler] Handler called");
    payload.validate().map_err(validation_error)?;
    let settings =
        service.update_settings(&tenant_id, payload).await.map_err(HandlerError::from)?;
    Ok(Json(settings))
}

pub async fn resolve_tier_change_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(id): Path<String>,
    Json(payload): Json<ApproveTierChangeRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[resolve_tier_change_handler] Handler called");
    let id = parse_object_id(&id)?;
    let quote = service.resolve_tier_change(id, payload).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}
