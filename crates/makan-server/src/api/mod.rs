//! HTTP surface of the co-signer.

mod handlers;
mod middleware;
mod router;
mod state;

pub use handlers::sign::{ErrorResponse, SignAssetRequest, SignAssetResponse};
pub use router::{build_router, run_http_server, MAX_BODY_BYTES};
pub use state::AppState;
