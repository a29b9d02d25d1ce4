use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handler::quote_handler::{
    create_quote_handler, deactivate_quote_handler, get_quote_handler, get_settings_handler,
    list_quotes_handler, resolve_tier_change_handler, send_quote_handler, update_quote_handler,
    update_settings_handler,
};
use crate::service::quote_service::QuoteService;

/// Staff routes: drafting, sending and contractor settings.
pub fn quote_router(service: Arc<dyn QuoteService>) -> Router {
    Router::new()
        .route("/quotes", post(create_quote_handler).get(list_quotes_handler))
        .route(
            "/quotes/{id}",
            get(get_quote_handler).put(update_quote_handler).delete(deactivate_quote_handler),
        )
        .route("/quotes/{id}/send", post(send_quote_handler))
        .route("/quotes/{id}/tier-change/resolve", post(resolve_tier_change_handler))
        .route("/settings/{tenant_id}", get(get_settings_handler).put(update_settings_handler))
        .with_state(service)
}
