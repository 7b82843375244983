use axum::http::HeaderValue;
use makan_escrow::Validator;
use std::sync::Arc;

/// Shared, read-only request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub validator: Arc<Validator>,
    pub allowed_origin: HeaderValue,
}
