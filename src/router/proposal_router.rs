use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handler::proposal_handler::{
    accept_proposal_handler, create_deposit_intent_handler, decline_proposal_handler,
    portal_status_handler, render_document_handler, request_tier_change_handler,
    set_area_selection_handler, submit_selections_handler, tier_options_handler,
    verify_deposit_handler,
};
use crate::service::proposal_service::ProposalService;

/// Customer routes: proposal review, deposit and the selection portal.
pub fn proposal_router(service: Arc<dyn ProposalService>) -> Router {
    Router::new()
        .route("/proposals/{id}/tiers", get(tier_options_handler))
        .route("/proposals/{id}/accept", post(accept_proposal_handler))
        .route("/proposals/{id}/decline", post(decline_proposal_handler))
        .route("/proposals/{id}/deposit/intent", post(create_deposit_intent_handler))
        .route("/proposals/{id}/deposit/verify", post(verify_deposit_handler))
        .route("/proposals/{id}/portal", get(portal_status_handler))
        .route("/proposals/{id}/portal/selections", put(set_area_selection_handler))
        .route("/proposals/{id}/portal/submit", post(submit_selections_handler))
        .route("/proposals/{id}/tier-change", post(request_tier_change_handler))
        .route("/proposals/{id}/documents/{kind}", get(render_document_handler))
        .with_state(service)
}
