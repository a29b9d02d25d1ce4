use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use tracing::info;
use validator::Validate;

use crate::dto::proposal_dto::{
    AcceptProposalRequest, AreaSelectionRequest, DeclineProposalRequest, RequestTierChangeRequest,
    VerifyDepositRequest,
};
use crate::dto::quote_dto::QuoteResponseDto;
use crate::handler::quote_handler::parse_object_id;
use crate::service::proposal_service::ProposalService;
use crate::util::error::{HandlerError, HandlerErrorKind};

fn validation_error(e: validator::ValidationErrors) -> HandlerError {
    HandlerError::new(HandlerErrorKind::Validation, e.to_string())
}

pub async fn tier_options_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id)?;
    let options = service.tier_options(id).await.map_err(HandlerError::from)?;
    Ok(Json(options))
}

pub async fn accept_proposal_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
    Json(payload): Json<AcceptProposalRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[accept_proposal_handler] Handler called");
    let id = parse_object_id(&id)?;
    let quote = service.accept(id, payload).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn decline_proposal_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
    Json(payload): Json<DeclineProposalRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[decline_proposal_handler] Handler called");
    let id = parse_object_id(&id)?;
    payload.validate().map_err(validation_error)?;
    let quote = service.decline(id, &payload.reason).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn create_deposit_intent_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[create_deposit_intent_handler] Handler called");
    let id = parse_object_id(&id)?;
    let intent = service.create_deposit_intent(id).await.map_err(HandlerError::from)?;
    Ok(Json(intent))
}

pub async fn verify_deposit_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
    Json(payload): Json<VerifyDepositRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[verify_deposit_handler] Handler called");
    let id = parse_object_id(&id)?;
    payload.validate().map_err(validation_error)?;
    let quote = service.verify_deposit(id, payload).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn portal_status_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id)?;
    let status = service.portal_status(id).await.map_err(HandlerError::from)?;
    Ok(Json(status))
}

pub async fn set_area_selection_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
    Json(payload): Json<AreaSelectionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[set_area_selection_handler] Handler called");
    let id = parse_object_id(&id)?;
    payload.validate().map_err(validation_error)?;
    let quote = service.set_area_selection(id, payload).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn submit_selections_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[submit_selections_handler] Handler called");
    let id = parse_object_id(&id)?;
    let quote = service.submit_selections(id).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn request_tier_change_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path(id): Path<String>,
    Json(payload): Json<RequestTierChangeRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[request_tier_change_handler] Handler called");
    let id = parse_object_id(&id)?;
    let quote = service.request_tier_change(id, payload).await.map_err(HandlerError::from)?;
    Ok(Json(QuoteResponseDto::from(quote)))
}

pub async fn render_document_handler(
    State(service): State<Arc<dyn ProposalService>>,
    Path((id, kind)): Path<(String, String)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id)?;
    let document = service.render_document(id, &kind).await.map_err(HandlerError::from)?;
    Ok(Json(document))
}
