use super::super::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::trace;
use std::sync::Arc;

pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    trace!("health check: ok");
    let validator = &state.validator;
    let listings: Vec<_> = validator
        .listings()
        .iter()
        .map(|listing| {
            serde_json::json!({
                "assetId": listing.asset_id,
                "price": listing.price,
                "amount": listing.amount,
                "appId": listing.app_id,
                "title": listing.title,
                "sold": listing.sold,
            })
        })
        .collect();
    Json(serde_json::json!({
        "status": "healthy",
        "escrowAddress": validator.escrow_address().to_string(),
        "listings": listings,
    }))
}
