//! HTTP routes for the signer daemon
//!
//! - `GET /heartbeat` is ungated
//! - read-style signing routes wait on the session gate
//! - `request*` routes additionally wait for the user's approval

pub mod envelope;
pub mod handlers;

pub use envelope::SignerResponse;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::server::AppState;

/// Create the gateway router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route("/heartbeat", get(handlers::heartbeat))
        .route("/deriveShieldedAddress", post(handlers::derive_shielded_address))
        .route("/generateAsset", post(handlers::generate_asset))
        .route("/recoverAccount", post(handlers::recover_account))
        .route("/generateMintData", post(handlers::generate_mint_data))
        .route(
            "/requestGenerateReclaimData",
            post(handlers::request_generate_reclaim_data),
        )
        .route(
            "/requestGeneratePrivateTransferData",
            post(handlers::request_generate_private_transfer_data),
        )
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::mirror_request())
}
